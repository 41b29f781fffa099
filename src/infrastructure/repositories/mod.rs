pub mod rest_resource;

pub use rest_resource::RestResourceApi;
