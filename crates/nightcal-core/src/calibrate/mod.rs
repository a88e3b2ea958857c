pub mod dark;
pub mod metadata;
pub mod subtract;

pub use dark::{build_master_dark, MasterDark};
pub use metadata::{check_compatibility, MetadataCheck, MetadataPolicy};
pub use subtract::subtract_dark;
