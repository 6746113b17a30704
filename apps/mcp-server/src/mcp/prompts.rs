//! MCP Prompt definitions

use std::collections::HashMap;

use pptx_engine::{Result, ServerError, COMMON_SHAPES, SHAPE_TYPES};

use super::protocol::{Prompt, PromptArgument, PromptContent, PromptMessage};

/// Get all prompt definitions
pub fn get_prompt_definitions() -> Vec<Prompt> {
    vec![
        Prompt {
            name: "flowchart_guidance".to_string(),
            description: Some(
                "Tips on building a flowchart slide with the available tools".to_string(),
            ),
            arguments: Some(vec![PromptArgument {
                name: "filename".to_string(),
                description: Some("Presentation to build the flowchart in".to_string()),
                required: Some(false),
            }]),
        },
        Prompt {
            name: "available_shapes".to_string(),
            description: Some("Common shape names usable with add_shape".to_string()),
            arguments: None,
        },
    ]
}

/// Get a prompt by name with arguments
pub fn get_prompt(name: &str, arguments: HashMap<String, String>) -> Result<Vec<PromptMessage>> {
    let text = match name {
        "flowchart_guidance" => flowchart_guidance(&arguments),
        "available_shapes" => available_shapes(),
        _ => return Err(ServerError::PromptNotFound(name.to_string())),
    };

    Ok(vec![PromptMessage {
        role: "user".to_string(),
        content: PromptContent::Text { text },
    }])
}

fn flowchart_guidance(args: &HashMap<String, String>) -> String {
    let filename = args
        .get("filename")
        .map(|s| s.as_str())
        .unwrap_or("{filename}");

    format!(
        r#"To create a flowchart in '{file}':
1. Use `create_or_clear_presentation` to start.
2. Use `add_slide` with a blank layout (layout_index=6).
3. Use `add_shape` for each element (FLOWCHART_TERMINATOR for start/end, FLOWCHART_PROCESS for steps,
   FLOWCHART_DECISION for branches). Put labels in `text` and position with `left_inches`/`top_inches`.
   Each call returns the new shape's ID.
4. Use `add_connector` with the start and end shape IDs to join elements (ELBOW by default,
   STRAIGHT or CURVED on request). Connectors attach to the facing sides of both shapes.
5. `batch_update` does all of the above in one call: name slides and shapes with `slide_object_id`
   and `shape_object_id`, then reference them with `page_object_id`, `start_shape_object_id`
   and `end_shape_object_id`.
6. Check the arrangement with `get_slide_content_description` or the resource
   `pptx://{file}/slide/{{slide_index}}/description`.
7. Optionally render the slide with `get_slide_image` (requires LibreOffice, may be slow)."#,
        file = filename
    )
}

fn available_shapes() -> String {
    let mut names: Vec<&str> = COMMON_SHAPES.to_vec();
    names.extend(
        SHAPE_TYPES
            .iter()
            .map(|s| s.name)
            .filter(|name| name.starts_with("FLOWCHART_") && !COMMON_SHAPES.contains(name)),
    );
    format!(
        "Common shape names for `add_shape`: {}. Many others exist; names are case-insensitive.",
        names.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(messages: Vec<PromptMessage>) -> String {
        match &messages[0].content {
            PromptContent::Text { text } => text.clone(),
        }
    }

    #[test]
    fn test_flowchart_guidance_mentions_connectors() {
        let mut args = HashMap::new();
        args.insert("filename".to_string(), "flow.pptx".to_string());
        let text = text_of(get_prompt("flowchart_guidance", args).unwrap());
        assert!(text.contains("'flow.pptx'"));
        assert!(text.contains("add_connector"));
        assert!(text.contains("pptx://flow.pptx/slide/{slide_index}/description"));
    }

    #[test]
    fn test_available_shapes_are_valid() {
        let text = text_of(get_prompt("available_shapes", HashMap::new()).unwrap());
        assert!(text.contains("FLOWCHART_DECISION"));
        assert!(text.contains("FLOWCHART_MAGNETIC_DISK"));

        let list = text
            .trim_start_matches("Common shape names for `add_shape`: ")
            .split(". Many")
            .next()
            .unwrap();
        for name in list.split(", ") {
            assert!(pptx_engine::shape_type(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_unknown_prompt() {
        assert!(matches!(
            get_prompt("nope", HashMap::new()),
            Err(ServerError::PromptNotFound(_))
        ));
    }
}
