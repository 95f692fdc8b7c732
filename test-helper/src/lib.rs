mod addr;

pub use addr::unused_endpoints;
