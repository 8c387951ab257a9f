pub mod auction;
pub mod ledger;
pub mod peers;
pub mod registry;

pub use auction::{Auction, AuctionId, Bid};
pub use ledger::{InventoryItem, ItemId, Ledger};
pub use peers::{PeerAction, PeerDirectory, PeerRecord};
pub use registry::{AuctionRegistry, BidDecision, MergeStats};
