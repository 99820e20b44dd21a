pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- sources table
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

-- categories table (fixed vocabulary, seeded below)
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE
);

INSERT OR IGNORE INTO categories (name, slug) VALUES
    ('தேசியம்', 'national'),
    ('உலகம்', 'world'),
    ('மலேசியா', 'malaysia'),
    ('இந்தியா', 'india'),
    ('அரசியல்', 'politics'),
    ('வணிகம்', 'business'),
    ('விளையாட்டு', 'sports'),
    ('சினிமா', 'entertainment'),
    ('தொழில்நுட்பம்', 'technology'),
    ('சுகாதாரம்', 'health'),
    ('கல்வி', 'education');

-- articles table
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    original_title TEXT NOT NULL,
    content TEXT NOT NULL,
    original_content TEXT NOT NULL,
    excerpt TEXT NOT NULL,
    image_url TEXT,
    source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
    original_url TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('draft', 'pending', 'published', 'rejected')),
    view_count INTEGER NOT NULL DEFAULT 0,
    publish_date TEXT,
    feed_published_at TEXT,
    is_featured INTEGER NOT NULL DEFAULT 0,
    is_breaking INTEGER NOT NULL DEFAULT 0,
    posted_to_facebook INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status);
CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles(created_at DESC);

-- fetch_logs table (one row per ingestion run)
CREATE TABLE IF NOT EXISTS fetch_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    status TEXT NOT NULL CHECK (status IN ('running', 'success', 'failed')),
    items_processed INTEGER NOT NULL DEFAULT 0,
    items_skipped INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_fetch_logs_started_at ON fetch_logs(started_at DESC);

-- facebook_post_logs table (one row per publish attempt)
CREATE TABLE IF NOT EXISTS facebook_post_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    status TEXT NOT NULL CHECK (status IN ('pending', 'success', 'failed')),
    error_message TEXT,
    response_data TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_facebook_post_logs_article ON facebook_post_logs(article_id, status);

-- email_alert_subscriptions table (at most one row per user)
CREATE TABLE IF NOT EXISTS email_alert_subscriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    alert_types TEXT NOT NULL DEFAULT '[]',
    last_sent_at TEXT,
    cooldown_minutes INTEGER NOT NULL DEFAULT 60
);

-- alert_logs table
CREATE TABLE IF NOT EXISTS alert_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_types TEXT NOT NULL,
    message TEXT NOT NULL,
    recipients TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;
