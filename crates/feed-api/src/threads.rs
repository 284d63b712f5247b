use std::collections::HashMap;

use feed_db::MAX_THREAD_DEPTH;
use feed_types::api::CommentView;
use tracing::debug;
use uuid::Uuid;

/// Group a post's comments into top-level comments with one level of replies.
///
/// Input is ordered oldest first; that order is kept for both levels. A reply
/// to a reply is attached to the top-level comment its chain starts from.
/// Comments whose chain leads to a missing parent, loops, or needs more than
/// [`MAX_THREAD_DEPTH`] hops are dropped.
pub fn build_threads(comments: Vec<CommentView>) -> Vec<CommentView> {
    let parents: HashMap<Uuid, Option<Uuid>> = comments.iter().map(|c| (c.id, c.parent_id)).collect();

    let mut roots: Vec<CommentView> = Vec::new();
    let mut root_index: HashMap<Uuid, usize> = HashMap::new();
    let mut replies: Vec<(Uuid, CommentView)> = Vec::new();

    for comment in comments {
        match comment.parent_id {
            None => {
                root_index.insert(comment.id, roots.len());
                roots.push(comment);
            }
            Some(_) => match find_root(&parents, comment.id) {
                Some(root) => replies.push((root, comment)),
                None => {
                    debug!("Dropping detached comment {}", comment.id);
                }
            },
        }
    }

    for (root, mut reply) in replies {
        if let Some(&i) = root_index.get(&root) {
            reply.replies.clear();
            roots[i].replies.push(reply);
        }
    }
    roots
}

fn find_root(parents: &HashMap<Uuid, Option<Uuid>>, start: Uuid) -> Option<Uuid> {
    let mut current = start;
    for _ in 0..=MAX_THREAD_DEPTH {
        match parents.get(&current)? {
            None => return Some(current),
            Some(parent) => current = *parent,
        }
    }
    None
}
