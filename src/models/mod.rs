pub mod actor;
pub mod discussion;

pub use actor::*;
pub use discussion::*;

/// Content-type tags shared by the seeders and the result merger
pub struct ContentType;

impl ContentType {
    /// Discussion documents (indexed by title)
    pub const DISCUSSIONS: &'static str = "discussions";

    /// Comment posts (indexed by body)
    pub const POSTS: &'static str = "posts";

    /// Whether hits of this type point at a post rather than a discussion
    pub fn is_post(content_type: &str) -> bool {
        content_type == Self::POSTS
    }
}
