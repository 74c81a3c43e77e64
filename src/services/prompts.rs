//! Prompt construction for pricing research.

use crate::domain::estimates::WorkType;

/// System message sent to chat-style providers.
pub const PRICING_SYSTEM_PROMPT: &str = "You are an expert electrical pricing research assistant with knowledge of construction costs and market rates.";

/// Build the market-pricing research prompt for one job.
pub fn pricing_research_prompt(scope_of_work: &str, city: &str, work_type: WorkType) -> String {
    let work_type_label = work_type.label().to_lowercase();

    format!(
        r#"You are an electrical pricing research assistant. Analyze the following job and provide pricing estimates based on current market rates.

JOB DETAILS:
- Type: {work_type_label}
- Location: {city}
- Scope: {scope_of_work}

TASK: Research typical pricing for this type of electrical work in {city}. Consider:
1. Labor costs for electricians in this area
2. Material costs
3. Typical markup/overhead
4. Local market rates from contractors

Provide a JSON response with this EXACT structure:
{{
  "averagePrice": <number>,
  "priceRange": {{
    "min": <number>,
    "max": <number>
  }},
  "sources": [
    {{
      "source": "<source name>",
      "price": <number>,
      "url": "<url if available>",
      "description": "<brief description>"
    }}
  ],
  "confidence": "<low|medium|high>",
  "searchQuery": "<the query you would use to search for this information>"
}}

Base confidence on:
- HIGH: Found 3+ specific comparable jobs in the same city
- MEDIUM: Found 2-3 general pricing guides or nearby city data
- LOW: Limited data, general national averages only

Return ONLY the JSON, no other text."#
    )
}
