pub mod registry;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;
