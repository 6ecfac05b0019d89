pub mod nitter_rss;
