/*!
 * Request extractors
 *
 * Public API:
 * - CanvasUserExtractor
 */
mod canvas_user;

pub use canvas_user::CanvasUserExtractor;
