pub mod composite;
pub mod fit;
pub mod transitions;
