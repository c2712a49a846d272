pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_dialogs.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_dialogs.sql")),
				"tables/002_dialog_system_labels.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_dialog_system_labels.sql")),
				"tables/003_dialog_search.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_dialog_search.sql")),
				"tables/004_search_language_configs.sql" => out
					.push_str(include_str!("../../../sql/tables/004_search_language_configs.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
