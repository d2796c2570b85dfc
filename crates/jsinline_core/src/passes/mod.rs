//! Rewrites run by the combined walk in [`crate::transform`].

pub(crate) mod binding_simplify;
pub(crate) mod eta_expansion;
pub(crate) mod insertion;
pub(crate) mod mark_inline;
pub(crate) mod object_projection;
