//! Server-rendered HTML pages.
//!
//! Every interpolated value goes through `escape`.

use crate::cats::Cat;
use crate::dogs::Dog;

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, page_name: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <link rel="stylesheet" href="/assets/style.css">
</head>
<body>
  <nav>
    <a href="/">Home</a>
    <a href="/page1">Cats</a>
    <a href="/page2">Add a cat</a>
    <a href="/page3">Find a cat</a>
    <a href="/page4">Dogs</a>
  </nav>
  <h1>{page_name}</h1>
{body}
</body>
</html>
"#,
        title = escape(title),
        page_name = escape(page_name),
    )
}

/// Home page showing the most recently created cat
pub fn index(current_name: &str) -> String {
    let body = format!(
        r#"  <p>The most recent cat is <strong id="currentName">{}</strong>.</p>
  <form action="/updateLast" method="post">
    <button type="submit">Give them another bed</button>
  </form>"#,
        escape(current_name)
    );
    layout("Home", "Home Page", &body)
}

/// Page 1: every cat
pub fn cat_list(cats: &[Cat]) -> String {
    let body = if cats.is_empty() {
        "  <p>No cats yet.</p>".to_string()
    } else {
        let items: String = cats
            .iter()
            .map(|cat| {
                format!(
                    "    <li><span class=\"name\">{}</span> owns {} bed(s)</li>\n",
                    escape(&cat.name),
                    cat.beds_owned
                )
            })
            .collect();
        format!("  <ul id=\"cats\">\n{items}  </ul>")
    };
    layout("Cats", "All Cats", &body)
}

/// Page 2: cat creation form
pub fn add_cat() -> String {
    let body = r#"  <form action="/setName" method="post">
    <label>First name <input name="firstname" type="text"></label>
    <label>Last name <input name="lastname" type="text"></label>
    <label>Beds <input name="beds" type="number" min="1"></label>
    <button type="submit">Create cat</button>
  </form>"#;
    layout("Add a cat", "Add a Cat", body)
}

/// Page 3: cat search form
pub fn find_cat() -> String {
    let body = r#"  <form action="/search" method="get">
    <label>Full name <input name="name" type="text"></label>
    <button type="submit">Search</button>
  </form>"#;
    layout("Find a cat", "Find a Cat", body)
}

/// Page 4: every dog plus the dog forms
pub fn dog_list(dogs: &[Dog]) -> String {
    let list = if dogs.is_empty() {
        "  <p>No dogs yet.</p>".to_string()
    } else {
        let rows: String = dogs
            .iter()
            .map(|dog| {
                format!(
                    "    <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    escape(&dog.name),
                    escape(&dog.breed),
                    dog.age
                )
            })
            .collect();
        format!(
            "  <table id=\"dogs\">\n    <tr><th>Name</th><th>Breed</th><th>Age</th></tr>\n{rows}  </table>"
        )
    };

    let body = format!(
        r#"{list}
  <form action="/createDog" method="post">
    <label>Name <input name="name" type="text"></label>
    <label>Breed <input name="breed" type="text"></label>
    <label>Age <input name="age" type="number" min="0"></label>
    <button type="submit">Create dog</button>
  </form>
  <form action="/increaseDogAge" method="post">
    <label>Name <input name="name" type="text"></label>
    <button type="submit">Happy birthday</button>
  </form>"#
    );
    layout("Dogs", "All Dogs", &body)
}

/// Rendered for unmatched routes
pub fn not_found(page: &str) -> String {
    let body = format!(
        "  <p>The page <code>{}</code> does not exist.</p>",
        escape(page)
    );
    layout("Not Found", "404 - Page Not Found", &body)
}
