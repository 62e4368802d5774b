//! Demo residents and listings for a fresh store.

use chrono::{Duration, Utc};
use marketplace_shared::{Comment, Offer, Role, Status, Tag};
use tracing::info;

use crate::error::Result;
use crate::marketplace::Marketplace;
use crate::records::Account;
use crate::store::NewPost;

fn resident(username: &str, password: &str, apartment: &str, role: Role) -> Account {
    Account {
        username: username.to_string(),
        password: password.to_string(),
        display_name: apartment.to_string(),
        role,
    }
}

/// Adds the demo data unless the store already has posts. Returns whether
/// anything was written.
pub fn seed_demo(market: &Marketplace) -> Result<bool> {
    let store = market.store();
    if store.count_posts()? > 0 {
        return Ok(false);
    }

    for account in [
        resident("admin", "admin123", "1A", Role::Admin),
        resident("maria4b", "password123", "4B", Role::User),
        resident("john12a", "password123", "12A", Role::User),
    ] {
        if store.find_user(&account.username)?.is_none() {
            store.insert_user(&account)?;
        }
    }

    let now = Utc::now();
    let listings = [
        NewPost {
            title: "Old Lamp - $5".to_string(),
            description: "Working desk lamp".to_string(),
            offer: Offer::ForSale {
                price: "5".to_string(),
            },
            tag: Tag::Goods,
            status: Status::Available,
            posted_by: "admin".to_string(),
            created_at: now - Duration::days(1),
            thumbs_up_by: vec![],
            comments: vec![],
        },
        NewPost {
            title: "Ride to city - 6 PM".to_string(),
            description: "Going downtown, can take 2 people".to_string(),
            offer: Offer::Service {
                time: "6 PM".to_string(),
            },
            tag: Tag::Services,
            status: Status::Available,
            posted_by: "john12a".to_string(),
            created_at: now - Duration::hours(2),
            thumbs_up_by: vec!["maria4b".to_string()],
            comments: vec![],
        },
        NewPost {
            title: "Selling Chair - $10".to_string(),
            description: "Comfortable wooden chair, barely used".to_string(),
            offer: Offer::ForSale {
                price: "10".to_string(),
            },
            tag: Tag::Goods,
            status: Status::Available,
            posted_by: "maria4b".to_string(),
            created_at: now - Duration::hours(1),
            thumbs_up_by: vec!["admin".to_string(), "john12a".to_string()],
            comments: vec![Comment {
                id: 1,
                text: "Is this still available?".to_string(),
                posted_by: "john12a".to_string(),
                created_at: now - Duration::minutes(30),
            }],
        },
    ];

    let count = listings.len();
    for listing in listings {
        store.insert_post(listing)?;
    }
    info!(posts = count, "seeded demo data");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn seeds_once_and_lists_the_chair_first() {
        let market = Marketplace::new(Arc::new(MemoryStore::new()));
        assert!(seed_demo(&market).unwrap());
        assert!(!seed_demo(&market).unwrap());

        let posts = market.list_posts().unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].title, "Selling Chair - $10");
        assert_eq!(posts[0].thumbs_up, 2);
        assert_eq!(posts[2].title, "Old Lamp - $5");

        let admin = market.get_user("admin").unwrap().unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.display_name, "1A");
    }
}
