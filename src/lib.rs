// Library exports for readstack
pub mod block;
pub mod layout;
pub mod mapping;
pub mod read_group;
pub mod reference;
pub mod sam;
pub mod schedule;
pub mod stats;
