//! UK Cable Database
//!
//! Current-carrying capacities, voltage drop figures and UK trade pricing for
//! the cable types an electrician typically specifies.
//!
//! # Supported cable types
//!
//! 1. **pvc-twin-earth** - 6242Y flat twin & earth
//! 2. **swa-xlpe** - 6944X steel wire armoured
//! 3. **pvc-single** - 6491X singles in conduit/trunking
//! 4. **lsoh-cable** - low smoke zero halogen
//! 5. **fire-resistant** - enhanced fire performance
//! 6. **micc** - mineral insulated copper clad
//! 7. **h07rn-f** - rubber flexible
//! 8. **nyy-j** - unarmoured XLPE/PVC power cable
//!
//! # Usage
//!
//! ```rust
//! use circuitguard::cables::CableDatabase;
//!
//! let db = CableDatabase::with_builtin_cables();
//! let selection = db.find_optimal_cable_size("pvc-twin-earth", 32.0, "C").unwrap();
//! assert_eq!(selection.size, 2.5);
//! ```

pub mod builtin;
pub mod database;
pub mod schema;

pub use builtin::{get_builtin_cables, load_cables_from_directory};
pub use database::{CableDatabase, CableSelection, CostAlternative};
pub use schema::*;
