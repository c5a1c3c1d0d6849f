//! `zipgate list` — list uploaded files.

use zipgate_core::Result;
use zipgate_remote::{FileGate, FilePage, ListQuery, RemoteStore};

pub async fn run<S: RemoteStore>(gate: &FileGate<S>, query: &ListQuery, json: bool) -> Result<()> {
    let page = gate.list_files(query).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print!("{}", render(&page, query.page.unwrap_or(1)));
    }
    Ok(())
}

fn render(page: &FilePage, number: u32) -> String {
    if page.page.is_empty() {
        return "  No files found.\n".to_string();
    }
    let mut out = String::new();
    for file in &page.page {
        let star = if file.favorite { "★" } else { " " };
        out.push_str(&format!(
            "  {star} {:<26} {:>12}  {}\n",
            file.id, file.size, file.name
        ));
    }
    out.push_str(&format!(
        "\n  Page {number} of {} ({} files)\n",
        page.pages.max(1),
        page.total
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use zipgate_remote::RemoteFile;

    #[test]
    fn empty_page_says_so() {
        let page = FilePage {
            page: vec![],
            total: 0,
            pages: 0,
        };
        assert_eq!(render(&page, 1), "  No files found.\n");
    }

    #[test]
    fn rows_show_id_size_and_name() {
        let page = FilePage {
            page: vec![RemoteFile {
                id: "clx1".into(),
                name: "cat.png".into(),
                size: 2048,
                mime_type: None,
                created_at: None,
                favorite: true,
            }],
            total: 1,
            pages: 1,
        };
        let out = render(&page, 1);
        assert!(out.contains("★ clx1"));
        assert!(out.contains("2048"));
        assert!(out.contains("cat.png"));
        assert!(out.contains("Page 1 of 1 (1 files)"));
    }
}
