/*!
Aggregation, filtering and coloring of constituency-level election results.

The pipeline takes one row per candidate, reduces the rows into one
[`ConstituencyRecord`] per constituency ([`aggregate()`]), attaches the records to
the constituency boundaries ([`merge_records`]) and computes the extent of
every state ([`state_bounds`]).

The merged data is then read by two pure engines:
- [`FilterSpec`] selects constituencies along several dimensions,
- [`ColorScheme`] assigns a display color to every constituency.

See the [`manual`] for the file formats.
*/

pub mod aggregate;
pub mod colors;
pub mod filter;
pub mod geo;
pub mod manual;
pub mod model;
pub mod search;

pub use crate::aggregate::*;
pub use crate::colors::*;
pub use crate::filter::*;
pub use crate::geo::*;
pub use crate::model::*;
pub use crate::search::*;
