//! Core zone types for spatial zone fusion.
//!
//! This crate provides the plain data records exchanged with the fusion
//! algorithm:
//!
//! - [`ZoneId`] - Stable opaque identity of a zone
//! - [`Zone`] - A zone with its feature vector, cell count and area
//! - [`Neighbor`] - An adjacency between two zones with its shared boundary length
//! - [`PairKey`] - An unordered pair of zone ids with a stable total order
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero runtime dependencies**. Geometry
//! (adjacency detection, boundary lengths) is computed elsewhere and handed
//! over as plain numbers, so these records can be filled from any source:
//! - Geometry adapters building zones from Voronoi cells or polygons
//! - Language bindings marshalling tables of attributes
//! - Tests and benchmarks generating synthetic grids
//!
//! # Example
//!
//! ```
//! use zone_types::{Neighbor, PairKey, Zone, ZoneId};
//!
//! let a = Zone::new(ZoneId::new(1), vec![0.2, 4.0]);
//! let b = Zone::new(ZoneId::new(2), vec![0.3, 5.0]).with_size(3);
//!
//! let neighbor = Neighbor::new(b.id, a.id).with_boundary_length(12.5);
//! assert_eq!(neighbor.key(), PairKey::new(a.id, b.id));
//! assert_eq!(b.dimension(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

mod neighbor;
mod zone;

pub use neighbor::{Neighbor, PairKey};
pub use zone::{Zone, ZoneId};
