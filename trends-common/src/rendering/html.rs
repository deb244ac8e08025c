/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

/// Style sheet shared by every HTML report produced by the toolset.
pub fn get_css() -> String {
    "<style type=\"text/css\">
            h1 {
                font-size: 14pt;
                margin-left: 15px;
                margin-right: 15px;
                text-align: center;
                font-family: Helvetica, Verdana, Geneva, Arial, sans-serif;
            }
            h2 {
                font-size: 12pt;
                margin-left: 15px;
                margin-right: 15px;
                text-align: center;
                font-family: Helvetica, Verdana, Geneva, Arial, sans-serif;
            }
            p, ol, ul {
                font-size: 12pt;
                font-family: Helvetica, Verdana, Geneva, Arial, sans-serif;
                margin-left: 15px;
                margin-right: 15px;
            }
            caption {
                font-family: Helvetica, Verdana, Geneva, Arial, sans-serif;
                font-size: 12pt;
                margin-left: 15px;
                margin-right: 15px;
            }
            table {
                font-size: 12pt;
                font-family: Helvetica, Verdana, Geneva, Arial, sans-serif;
                font-family: arial, sans-serif;
                border-collapse: collapse;
                align: center;
            }
            td, th {
                border: 1px solid #222222;
                text-align: centre;
                padding: 8px;
            }
            tr:nth-child(even) {
                background-color: #dddddd;
            }
            .numberCell {
                text-align: right;
            }
            .headerCell {
                text-align: center;
            }
        </style>"
        .to_string()
}

/// Opens an HTML report document: doctype, head with the shared style
/// sheet, body, and the page title.
pub fn report_head(title: &str) -> String {
    format!(
        "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">
<html>
    <head>
        <meta content=\"text/html; charset=UTF-8\" http-equiv=\"content-type\">
        <title>{}</title>
        {}
    </head>
    <body>
        <h1>{}</h1>
",
        title,
        get_css(),
        title
    )
}

pub fn report_tail() -> String {
    "    </body>\n</html>\n".to_string()
}

/// One captioned table in a report. The first cell of each row is
/// rendered as a row label; the remaining cells right-align as numbers.
pub struct ReportTable {
    pub caption: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(caption: &str) -> ReportTable {
        ReportTable {
            caption: caption.to_string(),
            headers: vec![],
            rows: vec![],
        }
    }

    pub fn get_html(&self) -> String {
        let mut s = String::from("<br><table align=\"center\">");
        s.push_str(&format!("<caption>{}</caption>", self.caption));
        if !self.headers.is_empty() {
            s.push_str("<tr>");
            for header in &self.headers {
                s.push_str(&format!("<th class=\"headerCell\">{}</th>", header));
            }
            s.push_str("</tr>");
        }
        for row in &self.rows {
            s.push_str("<tr>");
            for (i, cell) in row.iter().enumerate() {
                if i == 0 {
                    s.push_str(&format!("<td><b>{}</b></td>", cell));
                } else {
                    s.push_str(&format!("<td class=\"numberCell\">{}</td>", cell));
                }
            }
            s.push_str("</tr>");
        }
        s.push_str("</table>");
        s
    }
}

#[cfg(test)]
mod test {
    use super::ReportTable;

    #[test]
    fn test_report_table_layout() {
        let mut table = ReportTable::new("Estimated Change");
        table.headers = vec!["Class".to_string(), "Mean(pix)".to_string()];
        table.rows.push(vec!["Water".to_string(), "12.50".to_string()]);
        let html = table.get_html();
        assert!(html.contains("<caption>Estimated Change</caption>"));
        assert!(html.contains("<th class=\"headerCell\">Mean(pix)</th>"));
        assert!(html.contains("<td class=\"numberCell\">12.50</td>"));
        assert!(html.contains("<td><b>Water</b></td>"));
    }
}
