pub mod report;

pub use report::print_session;
