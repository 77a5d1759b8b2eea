mod memory;
mod notifier;

pub use memory::InMemoryStore;
pub use notifier::BroadcastNotifier;
