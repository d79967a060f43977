//! Task dependency edges and cycle detection (§4.C, §4.D).

use std::collections::{HashMap, HashSet, VecDeque};

use beehive_shared::errors::{BeehiveError, BeehiveResult};
use beehive_shared::model::{DependencyType, TaskDependency};
use uuid::Uuid;

use crate::rows::{parse_field, parse_uuid};
use crate::Store;

impl Store {
    /// Add `task_id -> depends_on_task_id`. Rejects the edge if it would
    /// create a cycle in the `blocks` subgraph (§4.D DFS invariant).
    pub async fn add_dependency(
        &self,
        task_id: Uuid,
        depends_on_task_id: Uuid,
        dependency_type: DependencyType,
    ) -> BeehiveResult<()> {
        if task_id == depends_on_task_id {
            return Err(BeehiveError::CyclicDependency(task_id));
        }

        if self.reaches(depends_on_task_id, task_id).await? {
            return Err(BeehiveError::CyclicDependency(task_id));
        }

        Store::with_retry(|| {
            sqlx::query(
                "INSERT INTO task_dependencies (task_id, depends_on_task_id, dependency_type)
                 VALUES (?, ?, ?)",
            )
            .bind(task_id.to_string())
            .bind(depends_on_task_id.to_string())
            .bind(dependency_type.as_str())
            .execute(self.pool())
        })
        .await?;
        Ok(())
    }

    pub async fn list_dependencies(&self, task_id: Uuid) -> BeehiveResult<Vec<TaskDependency>> {
        let rows: Vec<(String, String, String)> = Store::with_retry(|| {
            sqlx::query_as(
                "SELECT task_id, depends_on_task_id, dependency_type FROM task_dependencies
                 WHERE task_id = ?",
            )
            .bind(task_id.to_string())
            .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter()
            .map(|(t, d, ty)| {
                Ok(TaskDependency {
                    task_id: parse_uuid("task_id", &t)?,
                    depends_on_task_id: parse_uuid("depends_on_task_id", &d)?,
                    dependency_type: parse_field("dependency_type", &ty)?,
                })
            })
            .collect()
    }

    /// Blocking dependencies of `task_id` that are not yet `completed`,
    /// keyed to the engine's "dependencies unmet" check (§4.D).
    pub async fn unmet_blockers(&self, task_id: Uuid) -> BeehiveResult<Vec<Uuid>> {
        let rows: Vec<(String,)> = Store::with_retry(|| {
            sqlx::query_as(
                "SELECT d.depends_on_task_id FROM task_dependencies d
                 JOIN tasks t ON t.task_id = d.depends_on_task_id
                 WHERE d.task_id = ? AND d.dependency_type = 'blocks' AND t.status != 'completed'",
            )
            .bind(task_id.to_string())
            .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter()
            .map(|(id,)| parse_uuid("depends_on_task_id", &id))
            .collect()
    }

    /// Whether `from` can reach `to` by following any dependency edge,
    /// regardless of type — used to reject an edge that would close a cycle
    /// before it is ever inserted (§8 property 3: the dependency graph is a
    /// DAG at all times, not just its `blocks` subgraph).
    async fn reaches(&self, from: Uuid, to: Uuid) -> BeehiveResult<bool> {
        let edges: Vec<(String, String)> = Store::with_retry(|| {
            sqlx::query_as("SELECT task_id, depends_on_task_id FROM task_dependencies")
                .fetch_all(self.pool())
        })
        .await?;

        let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (t, d) in edges {
            let t = parse_uuid("task_id", &t)?;
            let d = parse_uuid("depends_on_task_id", &d)?;
            adjacency.entry(t).or_default().push(d);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            if node == to {
                return Ok(true);
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(next) = adjacency.get(&node) {
                queue.extend(next.iter().copied());
            }
        }
        Ok(false)
    }
}
