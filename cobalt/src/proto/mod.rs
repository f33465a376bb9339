#[rustfmt::skip]
pub mod cobalt {
    pub mod config {
        include!("cobalt.config.rs");
    }
    pub mod observation {
        include!("cobalt.observation.rs");
    }
    pub mod local_aggregation {
        include!("cobalt.local_aggregation.rs");
    }
    pub mod shuffler {
        include!("cobalt.shuffler.rs");
    }
}
