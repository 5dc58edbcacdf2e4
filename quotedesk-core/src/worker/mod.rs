pub mod executor;
pub mod scheduler;


pub use executor::{AutomationExecutor, PassReport, Stores};
pub use scheduler::JobScheduler;
