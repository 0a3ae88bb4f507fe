//! Runtime adapters bridging the scheduler to a task executor.

mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
