// Crate entry point. Re-export modules so tests and binaries can import them easily.
//
// Responsibilities
// - Only declare and expose modules. No business logic here.
//
// How it is used
// - Tests import modules from this crate root to reach the code under test.

pub mod config;

pub mod core {
    pub mod ports;
    pub mod stream;
    pub mod version_index;
}

pub mod application {
    pub mod errors;
    pub mod event_store;
    pub mod recovery;
}

pub mod adapters {
    pub mod in_memory {
        pub mod in_memory_commit_log;
    }
}
