//! Plain-text rendering of resolution emissions.

use dytt_extract::models::{DetailRecord, ListingRecord};
use dytt_sync::{Resource, ResourceStream};
use futures::StreamExt;

pub trait Render {
    fn count(&self) -> usize;
    fn render(&self);
}

impl Render for Vec<ListingRecord> {
    fn count(&self) -> usize {
        self.len()
    }

    fn render(&self) {
        for record in self {
            let published = record.published.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
            println!("{:>8}  {published:<10}  {}", record.id, record.title);
        }
    }
}

impl Render for DetailRecord {
    fn count(&self) -> usize {
        1
    }

    fn render(&self) {
        println!("{} ({})", self.title, self.id);
        println!("  link: {}", self.link);
        let fields = &self.fields;
        let labeled = [
            ("name", &fields.name),
            ("translated", &fields.translated_name),
            ("year", &fields.year),
            ("country", &fields.country),
            ("genre", &fields.genre),
            ("douban", &fields.douban_rating),
            ("imdb", &fields.imdb_rating),
            ("duration", &fields.duration),
            ("director", &fields.director),
        ];
        for (label, value) in labeled {
            if let Some(value) = value {
                println!("  {label}: {value}");
            }
        }
        if !fields.cast.is_empty() {
            println!("  cast: {}", fields.cast.join(", "));
        }
        if let Some(cover) = &self.cover {
            println!("  cover: {cover}");
        }
        if let Some(synopsis) = &self.synopsis {
            for line in synopsis.lines() {
                println!("  | {line}");
            }
        }
        if self.references.is_empty() {
            println!("  (not fetched yet)");
        }
        for reference in &self.references {
            println!("  -> {reference}");
        }
    }
}

impl Render for Vec<DetailRecord> {
    fn count(&self) -> usize {
        self.len()
    }

    fn render(&self) {
        for record in self {
            let marker = if record.is_filled() { '*' } else { ' ' };
            let rating = record.fields.douban_rating.as_deref().unwrap_or("-");
            println!("{marker}{:>8}  {rating:<28}  {}", record.id, record.title);
        }
    }
}

/// Print every emission of `stream`; returns whether it ended in success.
pub async fn report<T: Render>(mut stream: ResourceStream<T>) -> bool {
    let mut succeeded = false;
    while let Some(resource) = stream.next().await {
        match &resource {
            Resource::Loading(None) => println!("== loading"),
            Resource::Loading(Some(data)) => {
                println!("== loading, {} cached", data.count());
                data.render();
            },
            Resource::Success(data) => {
                println!("== done, {} records", data.count());
                data.render();
                succeeded = true;
            },
            Resource::Error { failure, data } => {
                eprintln!("== failed: {failure}");
                if let Some(data) = data {
                    println!("== showing {} cached records", data.count());
                    data.render();
                }
            },
        }
    }
    succeeded
}
