//! Placement strategies: how a built bundle lands on disk and how it is
//! cleaned up again. Both strategies must leave user-owned content alone;
//! Brain ownership is identified only by the filename prefix and by
//! managed JSON keys.

pub(crate) mod copy_merge;
mod marketplace;

pub use copy_merge::CopyMergePlacement;
pub use marketplace::MarketplacePlacement;

use crate::bundle::BuildOutput;
use crate::error::Result;
use crate::tools_config::{PlacementKind, Target};
use std::path::Path;

pub trait Placement: Send + Sync {
    /// Write the bundle under the resolved scope directory.
    fn place(&self, scope_dir: &Path, bundle: &BuildOutput) -> Result<()>;

    /// Remove Brain-owned content from the scope. Must not disturb
    /// user-owned files or keys.
    fn clean(&self, scope_dir: &Path) -> Result<()>;
}

/// Construct the placement strategy the target record asks for.
pub fn for_target(target: &Target) -> Box<dyn Placement> {
    match target.placement {
        PlacementKind::Marketplace => Box::new(MarketplacePlacement::new(target.clone())),
        PlacementKind::CopyAndMerge => Box::new(CopyMergePlacement::new(target.clone())),
    }
}
