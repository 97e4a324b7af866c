//! Non-interactive commands: dump, export, import

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cache::LocalCache;
use crate::config::Command;
use crate::models::ResourceKind;
use crate::network::client::ApiClient;
use crate::network::documents;
use crate::network::loader::{self, CollectionSource};
use crate::view::{self, FilterState};

/// Run `command` and write its report to `out`
pub async fn run(
    client: &ApiClient,
    export_dir: &Path,
    command: &Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Dump { kind, html } => dump(client, *kind, *html, out).await,
        Command::Export { document, .. } => {
            let filter = command.export_filter().unwrap_or_default();
            let path = documents::export_to_dir(client, export_dir, *document, &filter)
                .await
                .context("export failed")?;
            writeln!(out, "Saved {}", path.display())?;
            Ok(())
        }
        Command::Import { file } => {
            let count = client
                .import_file(file)
                .await
                .with_context(|| format!("import of {} failed", file.display()))?;
            writeln!(out, "Imported: {}", count)?;
            Ok(())
        }
    }
}

/// Load `kind` with its dependencies and print the unfiltered table
pub async fn dump<S: CollectionSource + Sync>(
    source: &S,
    kind: ResourceKind,
    html: bool,
    out: &mut impl Write,
) -> Result<()> {
    let collections = loader::load(source, kind, None)
        .await
        .with_context(|| format!("failed to load {}", kind.title().to_lowercase()))?;

    let mut cache = LocalCache::new();
    for (k, records) in collections {
        cache.replace(k, records);
    }

    let rows = view::build_view(kind, &cache, &FilterState::default());
    let text = if html {
        view::render_html(kind, &rows)
    } else {
        view::render_plain(kind, &rows)
    };
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleError;
    use crate::models::{Group, ListQuery, Record};
    use std::future::Future;

    struct Groups;

    impl CollectionSource for Groups {
        fn list_collection(
            &self,
            kind: ResourceKind,
            _query: &ListQuery,
        ) -> impl Future<Output = Result<Vec<Record>, ConsoleError>> + Send {
            async move {
                match kind {
                    ResourceKind::Group => Ok(vec![
                        Record::Group(Group { id: 2, name: "b<2>".into() }),
                        Record::Group(Group { id: 1, name: "A-1".into() }),
                    ]),
                    _ => Ok(Vec::new()),
                }
            }
        }
    }

    struct Down;

    impl CollectionSource for Down {
        fn list_collection(
            &self,
            _kind: ResourceKind,
            _query: &ListQuery,
        ) -> impl Future<Output = Result<Vec<Record>, ConsoleError>> + Send {
            async { Err(ConsoleError::validation("server down")) }
        }
    }

    #[tokio::test]
    async fn test_dump_plain() {
        let mut out = Vec::new();
        dump(&Groups, ResourceKind::Group, false, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("A-1"));
        assert!(text.contains("b<2>"));
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_dump_html_escapes() {
        let mut out = Vec::new();
        dump(&Groups, ResourceKind::Group, true, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("b&lt;2&gt;"));
        assert!(!text.contains("b<2>"));
    }

    #[tokio::test]
    async fn test_dump_failure_has_context() {
        let mut out = Vec::new();
        let err = dump(&Down, ResourceKind::Room, false, &mut out).await.unwrap_err();
        assert!(format!("{:#}", err).contains("server down"));
        assert!(out.is_empty());
    }
}
