//! Query result shapes.
//!
//! A query either yields one row mapping ([`Fetch::One`]) or an ordered
//! list of them ([`Fetch::All`]); [`QueryOutput`] carries whichever was asked for.

pub mod output;
pub mod row;

pub use output::{Fetch, QueryOutput};
pub use row::CustomDbRow;
