use serde::{Deserialize, Serialize};

/// One page of the feed's post listing, as returned by the graph API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub data: Vec<FeedPost>,
}

impl FeedPage {
    /// The newest post, if the page has any.
    pub fn into_latest(self) -> Option<FeedPost> {
        self.data.into_iter().next()
    }
}

/// A post as returned by the feed. `full_picture` is missing for text-only posts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedPost {
    pub id: String,
    #[serde(default)]
    pub full_picture: Option<String>,
}

impl FeedPost {
    /// Reference to the post's image, or `None` when the post carries no picture.
    pub fn post_ref(&self) -> Option<PostRef> {
        match self.full_picture.as_deref() {
            Some(url) if !url.is_empty() => Some(PostRef {
                post_id: self.id.clone(),
                image_url: url.to_string(),
            }),
            _ => None,
        }
    }
}

/// Post identifier plus the direct URL of its image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub post_id: String,
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_post_with_picture() {
        let page: FeedPage = serde_json::from_str(
            r#"{"data":[{"id":"123_456","full_picture":"https://cdn.example.com/a.jpg"}],"paging":{}}"#,
        )
        .unwrap();
        let post = page.into_latest().unwrap();
        assert_eq!(
            post.post_ref(),
            Some(PostRef {
                post_id: "123_456".to_string(),
                image_url: "https://cdn.example.com/a.jpg".to_string(),
            })
        );
    }

    #[test]
    fn empty_page_has_no_latest_post() {
        let page: FeedPage = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(page.into_latest().is_none());

        let page: FeedPage = serde_json::from_str(r#"{}"#).unwrap();
        assert!(page.into_latest().is_none());
    }

    #[test]
    fn text_only_post_has_no_image_ref() {
        let page: FeedPage = serde_json::from_str(r#"{"data":[{"id":"1_2"}]}"#).unwrap();
        assert!(page.into_latest().unwrap().post_ref().is_none());

        let post = FeedPost {
            id: "1_2".to_string(),
            full_picture: Some(String::new()),
        };
        assert!(post.post_ref().is_none());
    }
}
