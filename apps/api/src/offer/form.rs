//! The submission form served at `GET /`.

use crate::offer::templates::OfferLetterKind;

const FORM_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Offer Letter Generator</title>
<style>
body { font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }
label { display: block; margin-top: 0.75rem; }
input, select { width: 100%; padding: 0.3rem; }
input[type=checkbox] { width: auto; }
button { margin-top: 1.25rem; padding: 0.5rem 1.5rem; }
</style>
</head>
<body>
<h1>Offer Letter Generator</h1>
<form method="post" action="/">
"#;

const FORM_TAIL: &str = r#"<label><input type="checkbox" name="internship"> Internship</label>
<button type="submit">Generate</button>
</form>
</body>
</html>
"#;

/// `(field, label, input type)` in display order.
const TEXT_FIELDS: [(&str, &str, &str); 13] = [
    ("serial_number", "Serial number", "text"),
    ("name", "Name", "text"),
    ("father_name", "Father's name", "text"),
    ("mobile", "Mobile", "tel"),
    ("DATE", "Letter date", "date"),
    ("joda", "Joining date", "date"),
    ("city", "City", "text"),
    ("aadhar", "Aadhar number", "text"),
    ("pan", "PAN", "text"),
    ("role", "Role", "text"),
    ("manager", "Reporting manager", "text"),
    ("type", "Internship type (Full-time/Part-time)", "text"),
    ("stipend", "Stipend", "text"),
];

pub fn render_form() -> String {
    let mut html = String::from(FORM_HEAD);

    for (field, label, kind) in TEXT_FIELDS {
        html.push_str(&format!(
            "<label for=\"{field}\">{label}</label>\n<input id=\"{field}\" name=\"{field}\" type=\"{kind}\">\n"
        ));
    }

    html.push_str("<label for=\"oltype\">Offer letter type</label>\n<select id=\"oltype\" name=\"oltype\">\n");
    for kind in OfferLetterKind::ALL {
        let code = escape_html(kind.code());
        html.push_str(&format!("<option value=\"{code}\">{code}</option>\n"));
    }
    html.push_str("</select>\n");

    html.push_str(FORM_TAIL);
    html
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::placeholders::Placeholder;

    #[test]
    fn test_form_has_an_input_for_every_placeholder_field() {
        let html = render_form();
        for placeholder in Placeholder::ALL {
            assert!(
                html.contains(&format!("name=\"{}\"", placeholder.field())),
                "missing input for {}",
                placeholder.field()
            );
        }
        assert!(html.contains("name=\"internship\""));
    }

    #[test]
    fn test_form_offers_every_category() {
        let html = render_form();
        for kind in OfferLetterKind::ALL {
            assert!(html.contains(&format!("<option value=\"{}\">", kind.code())));
        }
    }
}
