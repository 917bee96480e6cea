//! Object-store key layout.
//!
//! Keys are fully qualified and scoped by the owning entity's id, so
//! concurrent jobs can never collide.

use clipforge_models::{AspectRatio, CandidateId, RenderId, UserId, VideoId};

/// Key for an uploaded source video.
pub fn upload_key(user_id: UserId, upload_id: &str, ext: &str) -> String {
    format!("uploads/{user_id}/{upload_id}.{ext}")
}

/// Key for a candidate thumbnail.
pub fn thumbnail_key(video_id: VideoId, idx: usize) -> String {
    format!("thumbnails/{video_id}_{idx}.jpg")
}

/// Key for a rendered output, with the aspect's `:` sanitized to `x`.
pub fn render_key(render_id: RenderId, candidate_id: CandidateId, aspect: AspectRatio) -> String {
    format!(
        "renders/{render_id}/{candidate_id}_{}.mp4",
        aspect.sanitized()
    )
}

/// Prefix under which all of a render's outputs live.
pub fn render_prefix(render_id: RenderId) -> String {
    format!("renders/{render_id}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_key_sanitizes_aspect() {
        let render_id = RenderId::new();
        let candidate_id = CandidateId::new();
        let key = render_key(render_id, candidate_id, AspectRatio::Vertical);
        assert_eq!(
            key,
            format!("renders/{render_id}/{candidate_id}_9x16.mp4")
        );
        assert!(!key.contains(':'));
    }

    #[test]
    fn upload_key_layout() {
        let user = UserId::new();
        let key = upload_key(user, "abc123", "mp4");
        assert_eq!(key, format!("uploads/{user}/abc123.mp4"));
    }

    #[test]
    fn thumbnail_key_layout() {
        let video = VideoId::new();
        assert_eq!(
            thumbnail_key(video, 3),
            format!("thumbnails/{video}_3.jpg")
        );
    }
}
