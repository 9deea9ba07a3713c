mod compound;
mod domain_repository;
mod errors;
mod solution;
mod tag;
mod unit;

pub use compound::Compound;
pub use domain_repository::{CompoundRepository, InMemoryCompoundRepository};
pub use errors::DomainError;
pub use solution::{Solution, SolutionIngredient};
pub use tag::CompoundTag;
pub use unit::{convert, Unit};
