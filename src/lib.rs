//! Concurrent, fixed-capacity hash tables with data-parallel bulk operations.
//!
//! The two containers, [`StaticSet`] and [`StaticMap`], store keys (and
//! values) in a fixed array of 64-bit atomic slot words and resolve
//! collisions by bucketed open addressing. Capacity never changes after
//! construction, which keeps every per-key operation lock-free: a bounded
//! probe walk plus at most one compare-and-swap per claimed slot.
//!
//! Bulk operations (`insert`, `contains`, `find`, `erase`, `retrieve_all`)
//! are submitted to a [`Stream`], an in-order asynchronous work queue, and
//! fan out over a pool of worker threads sized to the launch. For custom
//! concurrent workloads, [`StaticMap::make_ref`] / [`StaticSet::make_ref`]
//! hand out copyable per-key refs whose available operations are fixed at
//! compile time by [`op`] tags.
//!
//! # Example
//!
//! ```
//! use static_table::{op, Pair, StaticMap, Stream};
//!
//! # fn main() -> static_table::Result<()> {
//! let stream = Stream::new();
//! let mut map = StaticMap::<u64, u64>::new(
//!     100,
//!     u64::MAX, // empty key sentinel
//!     u64::MAX, // empty value sentinel
//!     Default::default(),
//!     Default::default(),
//!     &stream,
//! )?;
//!
//! let entries: Vec<Pair<u64, u64>> = (0..50).map(|k| Pair::new(k, k * k)).collect();
//! let inserted = map.insert(&entries, &stream)?;
//! assert_eq!(inserted, 50);
//!
//! let mut squares = vec![0u64; 50];
//! map.find(&(0..50).collect::<Vec<_>>(), &mut squares, &stream)?;
//! assert_eq!(squares[7], 49);
//!
//! let map_ref = map.make_ref((op::Contains, op::Find));
//! assert!(map_ref.contains(&7));
//! # Ok(())
//! # }
//! ```

pub mod alloc;
mod error;
mod extent;
pub mod hash;
mod kernels;
pub mod op;
mod open_addressing;
mod pair;
pub mod probing;
pub mod scope;
mod static_map;
mod static_set;
mod storage;
mod stream;

pub use error::{Error, Result};
pub use extent::{valid_extent, Extent};
pub use open_addressing::{DefaultKeyEqual, InsertResult, KeyEqual};
pub use pair::Pair;
pub use static_map::{MapRef, StaticMap};
pub use static_set::{SetRef, StaticSet};
pub use storage::SlotValue;
pub use stream::Stream;
