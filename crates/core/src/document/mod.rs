pub mod defaults;
pub mod id;
pub mod model;
pub mod schema;
pub mod status;
pub mod validate;
