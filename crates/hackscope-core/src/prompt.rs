//! Prompt templates for the two generation variants.

use crate::models::{GithubAnalysis, ProjectAnalysis, RepoKey};

/// Build the repository-analysis prompt. The sample is embedded verbatim.
pub fn repo_analysis_prompt(key: &RepoKey, content: &str) -> String {
    let header = format!("Analyze the following GitHub repository content for {}.", key);
    [
        header.as_str(),
        "Provide a technical assessment.",
        "",
        "**Your response MUST be a valid JSON object containing ONLY the JSON and nothing else. Do not wrap the JSON in code blocks, markdown, or add any additional text before or after the JSON.**",
        "Adhere STRICTLY to this JSON structure:",
        "{",
        r#"    "summary": "string (Single concise sentence: project purpose & main tech stack).","#,
        r#"    "technicalHighlights": "string (Single paragraph: core technical implementation, architecture, key technologies, patterns, notable decisions. Focus on specifics).","#,
        r#"    "keyFeatures": ["#,
        r#"        "string (Describe 1st key technical feature/implementation)","#,
        r#"        "string (Describe 2nd key technical feature/implementation)","#,
        r#"        "string (Describe 3rd key technical feature/implementation)","#,
        r#"        "string (Describe 4th key technical feature/implementation)","#,
        r#"        "string (Describe 5th key technical feature/implementation)""#,
        "    ],",
        r#"    "complexity": "string (1-2 sentences: code structure, organization, dependencies, overall technical complexity assessment).","#,
        r#"    "useCases": ["#,
        r#"        "string (Describe 1st specific technical use case/application)","#,
        r#"        "string (Describe 2nd specific technical use case/application)","#,
        r#"        "string (Optionally describe 3rd specific technical use case)""#,
        "    ],",
        r#"    "improvements": ["#,
        r#"        "string (Suggest 1st concrete technical improvement)","#,
        r#"        "string (Suggest 2nd concrete technical improvement)","#,
        r#"        "string (Optionally suggest 3rd concrete technical improvement)""#,
        "    ]",
        "}",
        "",
        "**Guidelines:**",
        "1. **JSON ONLY:** Output absolutely nothing before or after the JSON object.",
        "2. **No Code Blocks:** Do not enclose the JSON in ```json, ```, or any markdown formatting.",
        "3. **Be Specific:** Use names of libraries, frameworks, algorithms, patterns observed.",
        "4. **Concise:** Keep descriptions brief and to the point.",
        "5. **Technical Focus:** Emphasize implementation details, architecture, and tech choices.",
        "6. **Structure Adherence:** Ensure all keys are present and types match the schema above.",
        "7. **Handle Limited Info:** If content is minimal (e.g., just repo metadata), state that analysis is limited.",
        "",
        "**Repository Content to Analyze:**",
        "```",
        content,
        "```",
        "",
        "**JSON Response:**",
    ]
    .join("\n")
}

const PROJECT_SHAPE: &str = r#"{
  "title": "string",
  "description": "string",
  "gallery": { "images": ["string"], "videos": ["string"] },
  "summary": {
    "keyFeatures": ["string"],
    "technicalHighlights": ["string"],
    "impactPotential": ["string"],
    "learningCurve": ["string"]
  },
  "team": [
    {
      "name": "string",
      "role": "string",
      "avatar": "string",
      "links": { "github": "string", "linkedin": "string", "portfolio": "string" }
    }
  ],
  "details": {
    "techStack": ["string"],
    "links": { "github": "string", "demo": "string", "devpost": "string", "website": "string" },
    "duration": "string"
  }
}"#;

/// Build the project-page prompt from a scrape's markdown and metadata.
pub fn project_page_prompt(markdown: &str, metadata: &serde_json::Value) -> String {
    let markdown = if markdown.trim().is_empty() {
        "No markdown content available"
    } else {
        markdown
    };
    let metadata = serde_json::to_string_pretty(metadata).unwrap_or_else(|_| "{}".to_string());

    format!(
        "You are a judge in a hackathon competition tasked with evaluating project submissions. \
Below is the raw data from a project page, consisting of markdown content along with additional metadata. \
Extract the information needed for a structured project page.

Your response MUST be a single JSON object with exactly this shape and nothing else \
(no code blocks, no prose before or after):
{shape}

### Instructions
- gallery: image URLs (markdown, HTML or metadata such as og:image) and video URLs (e.g. YouTube links).
- summary.keyFeatures: from the \"What it does\" section.
- summary.technicalHighlights: from \"How we built it\" and the technologies mentioned.
- summary.impactPotential: inferred from \"Inspiration\" and \"What's next\".
- summary.learningCurve: from \"What we learned\" and \"Challenges we ran into\".
- team: members with role, avatar URL and any profile links.
- details.techStack: the \"Built With\" technologies.
- details.links: project URLs (GitHub, demo, page URL from metadata, website).
- details.duration: the project duration if mentioned, otherwise \"\".

If information is missing, use empty arrays, empty objects or empty strings. \
Ignore unrelated page chrome such as video player text or login prompts.

### Markdown Content
```
{markdown}
```

### Metadata
```json
{metadata}
```
",
        shape = PROJECT_SHAPE,
        markdown = markdown,
        metadata = metadata,
    )
}

/// Build the judging prompt for a stored project analysis.
pub fn project_score_prompt(project: &ProjectAnalysis) -> String {
    let page = &project.analysis;
    let repo_summary = match &project.github_analysis {
        GithubAnalysis::Analysis(record) => record.summary.as_str(),
        GithubAnalysis::Unavailable { .. } => "No repository analysis available",
    };

    format!(
        "Evaluate the following project based on these criteria:
- Innovation: How novel and creative are the project's features and approach?
- Technical: How well-implemented and technically sound is the solution?
- Design: How user-friendly and aesthetically pleasing is the user experience?
- Impact: What is the potential significance and reach of the project?

Provide scores out of 100 for each category (Innovation, Technical, Design, Impact) \
and an overall score. Respond with ONLY this JSON object:
{{
  \"overall\": <overall_score>,
  \"categories\": {{
    \"Innovation\": <innovation_score>,
    \"Technical\": <technical_score>,
    \"Design\": <design_score>,
    \"Impact\": <impact_score>
  }}
}}

Project Information:
- Title: {title}
- Description: {description}
- Key Features: {features}
- Technical Highlights: {highlights}
- Impact Potential: {impact}
- Tech Stack: {stack}
- GitHub Analysis Summary: {repo_summary}
",
        title = page.title,
        description = page.description,
        features = page.summary.key_features.join(", "),
        highlights = page.summary.technical_highlights.join(", "),
        impact = page.summary.impact_potential.join(", "),
        stack = page.details.tech_stack.join(", "),
        repo_summary = repo_summary,
    )
}
