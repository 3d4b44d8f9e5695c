use std::time::Duration;

use color_eyre::Result;
use reqwest::Client;
use serde_json::Value;

/// One chat-completions call. Generation failures are surfaced immediately;
/// the query path never retries them.
pub async fn generate(
	cfg: &nook_config::GenerationProviderConfig,
	messages: &[Value],
) -> Result<Option<String>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	Ok(parse_generation_response(json))
}

fn parse_generation_response(json: Value) -> Option<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())?;

	if content.trim().is_empty() {
		return None;
	}

	Some(content.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_first_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "The square root of 9 is 3." } },
				{ "message": { "content": "ignored" } }
			]
		});

		assert_eq!(
			parse_generation_response(json).as_deref(),
			Some("The square root of 9 is 3.")
		);
	}

	#[test]
	fn empty_content_is_absent() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "   " } }]
		});

		assert_eq!(parse_generation_response(json), None);
	}

	#[test]
	fn missing_choices_is_absent() {
		let json = serde_json::json!({ "id": "cmpl-1" });

		assert_eq!(parse_generation_response(json), None);
	}
}
