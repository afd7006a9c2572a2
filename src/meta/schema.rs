//! SQLite schema definition

/// SQL schema for the catalogue database
pub const SCHEMA_SQL: &str = r#"
-- Navigation headings: top-level site menu
CREATE TABLE IF NOT EXISTS navigation_headings (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    "order" INTEGER NOT NULL DEFAULT 0,
    last_scraped_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Categories: collections, optionally nested under a parent
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    image_url TEXT,
    product_count INTEGER,
    "order" INTEGER NOT NULL DEFAULT 0,
    parent_id TEXT REFERENCES categories(id),
    navigation_id TEXT REFERENCES navigation_headings(id),
    last_scraped_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Products: listing summaries keyed by the catalogue's own ID
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL UNIQUE,
    source_url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    author TEXT,
    price REAL,
    original_price REAL,
    currency TEXT NOT NULL DEFAULT 'GBP',
    image_url TEXT,
    condition TEXT,
    format TEXT,
    in_stock INTEGER NOT NULL DEFAULT 1,
    category_id TEXT REFERENCES categories(id),
    last_scraped_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Product details: one per product
CREATE TABLE IF NOT EXISTS product_details (
    id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL UNIQUE REFERENCES products(id) ON DELETE CASCADE,
    description TEXT,
    publisher TEXT,
    publication_date TEXT,
    isbn TEXT,
    isbn13 TEXT,
    pages INTEGER,
    language TEXT,
    dimensions TEXT,
    weight TEXT,
    specs TEXT NOT NULL DEFAULT '{}',
    ratings_avg REAL,
    reviews_count INTEGER,
    related_products TEXT NOT NULL DEFAULT '[]',
    recommended_products TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Reviews: replaced wholesale on each detail scrape
CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    author TEXT,
    rating INTEGER,
    title TEXT,
    text TEXT,
    review_date TEXT,
    verified INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Scrape jobs: append-only audit trail of scrape attempts
CREATE TABLE IF NOT EXISTS scrape_jobs (
    id TEXT PRIMARY KEY,
    target_url TEXT NOT NULL,
    target_type TEXT NOT NULL,
    status TEXT NOT NULL,
    items_scraped INTEGER NOT NULL DEFAULT 0,
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 3,
    started_at TEXT,
    finished_at TEXT,
    error_log TEXT,
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);
CREATE INDEX IF NOT EXISTS idx_categories_navigation ON categories(navigation_id);
CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id);
CREATE INDEX IF NOT EXISTS idx_reviews_product ON reviews(product_id);
CREATE INDEX IF NOT EXISTS idx_jobs_created ON scrape_jobs(created_at);
"#;
