pub mod comment;
pub mod follow;
pub mod like;
pub mod notification;
pub mod post;
pub mod user;

pub use comment::{CommentResponse, NewPostComment, PostComment};
pub use follow::{Follow, FollowRelation, NewFollow};
pub use like::{NewPostLike, PostLike};
pub use notification::{NewNotification, Notification, NotificationResponse};
pub use post::{NewPost, NewPostView, Post, PostResponse, PostView, RelatedPostsResponse};
pub use user::{NewUser, UpdateUserProfile, User, UserProfileResponse, UserResponse};
