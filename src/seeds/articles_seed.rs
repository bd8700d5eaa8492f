use uuid::Uuid;

use crate::database::Datastore;
use crate::models::{now_millis, Article, ArticleCategory};

struct DemoArticle {
    title: &'static str,
    body: &'static str,
    category: ArticleCategory,
    tags: &'static [&'static str],
    published: bool,
}

const DEMO_ARTICLES: &[DemoArticle] = &[
    DemoArticle {
        title: "Getting Started with Actix Web",
        body: "A walk through building a small JSON API: routing, extractors, shared state and middleware.\n\nWe finish with a handler that talks to MongoDB and returns typed errors.",
        category: ArticleCategory::Tech,
        tags: &["rust", "actix", "backend", "guide"],
        published: true,
    },
    DemoArticle {
        title: "Mastering React Hooks",
        body: "useState, useEffect and useContext cover most of what a component needs. This article shows when each one fits and the mistakes that cause extra renders.",
        category: ArticleCategory::Tech,
        tags: &["react", "javascript", "hooks", "frontend"],
        published: true,
    },
    DemoArticle {
        title: "Why Seed Data Matters",
        body: "Reproducible demo data makes onboarding faster and bugs easier to reproduce. We look at keeping seed scripts idempotent and safe to rerun.",
        category: ArticleCategory::General,
        tags: &["database", "seeding", "workflow"],
        published: true,
    },
    DemoArticle {
        title: "The Expanding Universe of AI (Draft)",
        body: "Notes on where machine learning is heading and the open ethical questions. Still a draft.",
        category: ArticleCategory::Tech,
        tags: &["ai", "machine learning", "draft"],
        published: false,
    },
    DemoArticle {
        title: "GraphQL vs. REST",
        body: "Both styles can serve the same product. We compare caching, tooling and versioning to help pick one for a new API.",
        category: ArticleCategory::Tech,
        tags: &["graphql", "rest", "api", "architecture"],
        published: true,
    },
    DemoArticle {
        title: "Containers for Everyday Development",
        body: "Docker images give every developer the same database and the same runtime. A practical introduction with a compose file for this very project.",
        category: ArticleCategory::General,
        tags: &["docker", "devops", "deployment"],
        published: true,
    },
    DemoArticle {
        title: "Web Development Trends to Watch",
        body: "WebAssembly, edge runtimes and AI-assisted tooling are changing how sites are built and shipped. A short tour of what is worth learning this year.",
        category: ArticleCategory::News,
        tags: &["web development", "trends", "webassembly"],
        published: true,
    },
    DemoArticle {
        title: "Security Basics for Web Developers (Draft)",
        body: "XSS, injection, CSRF and weak session handling, with the defensive habits that prevent them. Examples to follow.",
        category: ArticleCategory::Tech,
        tags: &["security", "owasp", "draft"],
        published: false,
    },
    DemoArticle {
        title: "A Practical Guide to Test-Driven Development",
        body: "Red, green, refactor. We build a small feature test-first and discuss where the approach pays off and where it slows you down.",
        category: ArticleCategory::General,
        tags: &["tdd", "testing", "agile"],
        published: true,
    },
    DemoArticle {
        title: "Release Notes: Chat Arrives on the Platform",
        body: "Signed-in readers can now talk in real time from the sidebar. Messages are not stored; everyone connected sees them as they arrive.",
        category: ArticleCategory::News,
        tags: &["announcement", "chat"],
        published: true,
    },
];

/// Inserts the demo articles when the collection is empty. Returns how many were inserted.
pub async fn seed_demo_articles(store: &dyn Datastore) -> usize {
    match store.count_articles().await {
        Ok(0) => {}
        Ok(count) => {
            log::info!("📰 Articles: {} already in storage, skipping seed", count);
            return 0;
        }
        Err(e) => {
            log::error!("   ❌ Could not count articles: {}", e);
            return 0;
        }
    }

    log::info!("📰 Articles: seeding {} demo articles...", DEMO_ARTICLES.len());
    let base = now_millis();
    let mut inserted = 0;

    for (i, demo) in DEMO_ARTICLES.iter().enumerate() {
        // Spread creation times so the default newest-first order is stable
        let at = base - (DEMO_ARTICLES.len() - i) as i64 * 60_000;
        let id = Uuid::new_v4().to_string();
        let article = Article {
            image_url: Some(format!("https://picsum.photos/seed/{}/800/400", &id[..8])),
            id,
            title: demo.title.to_string(),
            body: demo.body.to_string(),
            category: demo.category,
            tags: demo.tags.iter().map(|t| t.to_string()).collect(),
            likes: 0,
            is_published: demo.published,
            created_at: at,
            updated_at: at,
        };

        match store.insert_article(&article).await {
            Ok(()) => inserted += 1,
            Err(e) => log::error!("   ❌ Failed to seed article '{}': {}", demo.title, e),
        }
    }

    log::info!("   ✅ Inserted {} demo articles", inserted);
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ArticleStore, MemoryStore};
    use crate::models::{ArticleListParams, ArticleQuery, Audience};

    #[tokio::test]
    async fn test_seed_articles_once() {
        let store = MemoryStore::new();
        assert_eq!(seed_demo_articles(&store).await, DEMO_ARTICLES.len());
        assert_eq!(seed_demo_articles(&store).await, 0);
        assert_eq!(store.count_articles().await.unwrap(), DEMO_ARTICLES.len() as u64);
    }

    #[tokio::test]
    async fn test_seed_mixes_drafts_and_categories() {
        let store = MemoryStore::new();
        seed_demo_articles(&store).await;

        let query = ArticleQuery::from_params(&ArticleListParams::default(), Audience::Public).unwrap();
        let (page, total) = store.query_articles(&query).await.unwrap();
        let drafts = DEMO_ARTICLES.iter().filter(|a| !a.published).count();
        assert_eq!(total as usize, DEMO_ARTICLES.len() - drafts);
        assert!(drafts > 0);
        // newest first is the last demo entry
        assert_eq!(page[0].title, DEMO_ARTICLES[DEMO_ARTICLES.len() - 1].title);

        for category in [ArticleCategory::Tech, ArticleCategory::News, ArticleCategory::General] {
            assert!(DEMO_ARTICLES.iter().any(|a| a.category == category));
        }
    }
}
