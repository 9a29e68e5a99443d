pub mod cart_mutations;
pub mod context;

pub use cart_mutations::CartMutations;
pub use context::MutationContext;
