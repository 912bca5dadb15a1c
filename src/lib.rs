//! Disk-resident B+ tree index mapping integer keys to fixed-size records.
//!
//! An index lives in a single file of 512-byte blocks: block 0 carries the
//! self-describing metadata (magic, root, height, the record schema), block 1
//! starts out as an empty leaf that is also the root, and further leaves and
//! internal nodes are allocated as inserts overflow existing nodes. Leaves
//! keep their records sorted and chain to their right sibling; internal
//! nodes route by separator keys. The tree supports insertion and point
//! lookup.
//!
//! ```no_run
//! use burrow::data_generator::{employee_schema, RecordGenerator};
//! use burrow::BPlusTree;
//!
//! # fn main() -> burrow::Result<()> {
//! let mut tree = BPlusTree::create("employees.idx".as_ref(), employee_schema())?;
//! let mut generator = RecordGenerator::new();
//! let record = generator.random_record(tree.schema(), 42);
//! tree.insert(&record)?;
//! assert!(tree.search(42)?.is_some());
//! tree.close()?;
//! # Ok(())
//! # }
//! ```

pub mod data_generator;
mod error;
pub mod index;
pub mod pager;
pub mod record;

pub use error::{IndexError, Result};
pub use index::BPlusTree;
pub use record::{Field, FieldType, FieldValue, Record, TableSchema};
