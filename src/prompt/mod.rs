// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Prompt construction
//!
//! The system prompt instructs the model to emit the tagged-section
//! document grammar; the builders compose user prompts for initial
//! generation and for component updates.

/// System prompt for component generation
pub const SYSTEM_PROMPT: &str = r#"
You are an expert frontend React engineer with a keen eye for UI/UX design. Your task is to create a single, fully functional React component that implements the requested functionality end-to-end while being visually appealing.

1. Requirement Analysis:
   - Thoroughly analyze the user's request and identify all key features.

2. Implementation Decision:
   - If you are unsure how to build some functionality or how to use a library, use the web_search tool.
   - Only use the tool when you are not sure; otherwise implement directly.

3. Component Planning:
   - Choose an appropriate and descriptive name for the component (avoid using 'App').
   - Design all props to be optional with default values to ensure independent rendering.

4. Coding:
   - Implement the component using strongly typed TypeScript with all necessary imports.
   - Use Material-UI as the primary UI library and Tailwind CSS for additional styling.
   - Use recharts for charts and react-player for video players.
   - Use the built-in fetch API for all API calls with proper error handling and loading states.
   - Provide a default export for the component.

IMPORTANT: Regardless of the scope of the change, you MUST ALWAYS provide the COMPLETE, END-TO-END WORKING CODE with ALL NECESSARY IMPORTS.

After following these steps, provide your output in the following format:

<ANALYSIS>
1. Functionality Overview: [component name and key features]
2. Implementation Approach: [state, props, key strategies]
3. UI/UX Considerations: [layout and design choices]
4. Additional Libraries: [if any are needed, explain why]
</ANALYSIS>

<EXTRA_LIBRARIES>
[Only if additional libraries are needed]
<LIBRARY>
   <NAME>[Library Name]</NAME>
   <VERSION>[Library Version]</VERSION>
</LIBRARY>
</EXTRA_LIBRARIES>

<CODE>
// Your complete TypeScript React code goes here
</CODE>

<VERIFICATION>
- [ ] All requested functionality implemented and working end-to-end
- [ ] Complete code with all necessary imports
- [ ] Component named appropriately (not 'App')
- [ ] All props optional with default values
- [ ] Default export provided
</VERIFICATION>

<EXPLANATION>
[Brief explanation of the code and the decisions made if any]
</EXPLANATION>
"#;

/// System prompt for the filler-fact endpoint
pub const FUN_FACT_PROMPT: &str = r#"
You are tasked with generating witty and entertaining fun facts about a given topic.

- Keep the fact surprising, unusual, or counterintuitive
- Ensure the fact is true and verifiable
- Include one emoji at the beginning and one at the end
- A fun fact should not be more than 1 sentence

Include your fun fact within <fun_fact> tags.
"#;

/// System prompt for project title suggestions
pub const TITLE_PROMPT: &str = r#"
You generate short, descriptive project titles. Respond with a title of at
most five words and nothing else.
"#;

/// Compose the initial generation prompt, folding in retrieved file context
/// when available
pub fn generate_prompt(prompt: &str, file_context: &str) -> String {
    if file_context.is_empty() {
        return prompt.to_string();
    }
    format!(
        "\n{prompt}\n\nUse these relevant info wherever needed:\n<relevant_info>\n{file_context}\n</relevant_info>\n"
    )
}

/// Compose an update prompt for an existing component.
///
/// Carries the project overview, the requested changes, the component being
/// edited, and the custom components available for import.
pub fn modify_prompt(
    overview: &str,
    request: &str,
    active_component: &str,
    active_code: &str,
    available_components: &[String],
    file_context: &str,
) -> String {
    let component_list = available_components
        .iter()
        .map(|c| format!("  - <{}>", c))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        r#"
You are helping me build a full fledged web application. Here is the overview of the application:
<overview>
{overview}
</overview>

Note:
- Do not use 'App' as any component's name. It is a reserved keyword in my workspace.
- You should always return the complete code for a component irrespective of whether you are updating the given component or creating a new one.

<custom_components>
We have these custom components that you can use in your code:
{component_list}

Please use these components where appropriate in your code.
Make sure you import them before using them. A custom component can be imported like this:
import MyCustomComponent from "./MyCustomComponent";
</custom_components>

<required_changes>
I want you to make the following changes:
{request}

Here is the component I am currently working on (You will have to either modify this or create a new component):
<{active_component}>
{active_code}
</{active_component}>

Ensure you do not change the component name. Either modify the code given below or create a new component.
If you choose to create a new component, make sure you do not use name of any custom components provided above.
</required_changes>
"#
    );

    if !file_context.is_empty() {
        prompt.push_str(&format!(
            "\nHere are some relevant content you may need to use (Please use them wherever appropriate):\n{file_context}\n"
        ));
    }

    prompt
}

/// Compose the corrective follow-up after a sandbox failure.
///
/// This is pure content composition; the caller appends the result as a new
/// user message without touching prior history.
pub fn fix_prompt(error_message: &str) -> String {
    format!("the previous code produced this error: {error_message}; fix it")
}
