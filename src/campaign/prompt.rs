//! Prompt templates for campaign generation and the expert refinement pass.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::features::{FeatureReport, FeatureVector};

const DATE_FMT: &str = "%B %d, %Y";

/// Calendar facts the model needs to date campaigns in the coming week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignContext {
    pub current_date: String,
    pub current_time: String,
    pub current_day: String,
    pub tomorrow: String,
    pub this_weekend_start: String,
    pub this_weekend_end: String,
    pub next_week_start: String,
    /// morning | afternoon | evening
    pub time_context: String,
    /// weekday | weekend
    pub day_context: String,
}

impl CampaignContext {
    pub fn from_datetime(now: NaiveDateTime) -> Self {
        let weekday = i64::from(now.weekday().num_days_from_monday());
        let day = |offset: i64| (now + Duration::days(offset)).format(DATE_FMT).to_string();

        let time_context = match now.hour() {
            h if h < 12 => "morning",
            h if h < 17 => "afternoon",
            _ => "evening",
        };
        let day_context = if weekday < 5 { "weekday" } else { "weekend" };

        Self {
            current_date: now.format(DATE_FMT).to_string(),
            current_time: now.format("%I:%M %p").to_string(),
            current_day: now.format("%A").to_string(),
            tomorrow: day(1),
            this_weekend_start: day((5 - weekday).rem_euclid(7)),
            this_weekend_end: day((6 - weekday).rem_euclid(7)),
            next_week_start: day(7),
            time_context: time_context.to_string(),
            day_context: day_context.to_string(),
        }
    }

    /// Server-local wall clock.
    pub fn now() -> Self {
        Self::from_datetime(chrono::Local::now().naive_local())
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// First pass: the feature vector plus the required output shape.
pub fn marketing_prompt(ctx: &CampaignContext, vector: &FeatureVector) -> String {
    format!(
        r#"You are a strategic marketing consultant with deep insights into local market dynamics. Your task is to generate a concise, poster-ready marketing campaign recommendation for a local store based on the provided JSON data and current real-time context. The recommendation should be visually appealing, succinct, and output in valid JSON format only (without any additional text).

CURRENT REAL-TIME CONTEXT:
- Current Date: {current_date}
- Current Time: {current_time}
- Current Day: {current_day}
- Time Context: {time_context}
- Day Context: {day_context}
- Tomorrow: {tomorrow}
- This Weekend: {weekend_start} - {weekend_end}
- Next Week Start: {next_week}

IMPORTANT: Use these current dates for your campaign durations. Do NOT use past dates or hardcoded dates. Use the current date context provided above.

The JSON data you will use includes:
- "store_counts": Number of nearby competitor stores by category (e.g., cafe, book_store, grocery_store).
- "avg_ratings": Average customer ratings for each store category.
- "spatial_density": How many competitor stores sit close to the market center.
- "centroid": Geographic center coordinates for the market.
- "weather": 7-day daily forecast (max/min temp, precipitation, weather code) and summary stats (avg_max_temp, avg_min_temp, total_precip).
- "hour_of_day" and "day_of_week": The current temporal context for time-sensitive promotions.
- "store_sentiment": Customer sentiment label and score for each store category.
- "campaign_suitability_score": A metric indicating overall campaign readiness.

Output your recommendation using the following JSON structure exactly, without any additional text:

{{
  "Insights": [
    "Insight 1: Based on the 7-day weather forecast and time context",
    "Insight 2: Based on local competition analysis",
    "Insight 3: Based on spatial density and market saturation",
    "Insight 4: Based on customer ratings and sentiment analysis",
    "Insight 5: Based on consumer behavior patterns for the week"
  ],
  "Campaigns": [
    {{
      "Campaign Title": "A compelling, time-relevant title for a specific day or period in the next 7 days",
      "Campaign Description": "2-3 sentences that use the 7-day forecast, time and market conditions",
      "Campaign Duration": "Dates from the next 7 days (e.g., '{current_date} - {next_week}')",
      "Discount/Promo": "A promotional offer that fits the forecast and market context"
    }},
    {{
      "Campaign Title": "A second title for another day or period in the next 7 days",
      "Campaign Description": "2-3 sentences targeting another aspect of the forecast and market conditions",
      "Campaign Duration": "Dates from the next 7 days",
      "Discount/Promo": "Another relevant promotional offer"
    }}
  ]
}}

CRITICAL REQUIREMENTS:
1. Use ONLY dates from the next 7 days for campaign durations
2. Make campaigns relevant to the weather and market context for specific days in the upcoming week
3. Consider the 7-day weather forecast in your recommendations
4. Base insights on the actual data provided
5. Ensure all dates are current and realistic
6. Keep campaign descriptions to 2-3 sentences maximum

Generate at least two campaign recommendations with distinct insights based on the JSON data below.

JSON Data:
{vector}
"#,
        current_date = ctx.current_date,
        current_time = ctx.current_time,
        current_day = ctx.current_day,
        time_context = ctx.time_context,
        day_context = ctx.day_context,
        tomorrow = ctx.tomorrow,
        weekend_start = ctx.this_weekend_start,
        weekend_end = ctx.this_weekend_end,
        next_week = ctx.next_week_start,
        vector = pretty(vector),
    )
}

/// Second pass: critique and improve `initial` against the cleaned inputs.
pub fn expert_prompt(
    ctx: &CampaignContext,
    store_type: &str,
    report: &FeatureReport,
    initial: &Value,
) -> String {
    let zipcode = report.vector.zipcode.as_deref().unwrap_or("unknown");
    format!(
        r#"You are a senior marketing expert with 15+ years of experience in retail marketing, consumer psychology, and campaign optimization. Your role is to analyze and improve marketing campaign recommendations to make them more realistic, compelling, and effective.

CURRENT CONTEXT:
- Current Date: {current_date}
- Store Type: {store_type}
- Location: {zipcode}

RAW CLEANED DATA FOR ANALYSIS:
Store Data: {metrics}
Weather Data: {weather}
Store Sentiment: {sentiment}

ANALYZE THE FOLLOWING INITIAL CAMPAIGN RECOMMENDATIONS:
{initial}

MARKETING EXPERT TASK:
1. Realism Check: Ensure campaigns are realistic for the store type and market conditions
2. Consumer Psychology: Make recommendations more psychologically compelling
3. Competitive Edge: Ensure campaigns stand out from typical local promotions
4. Actionability: Make campaigns more actionable and measurable
5. Seasonal Relevance: Ensure weather and seasonal factors are properly leveraged
6. Local Market Fit: Adapt to local consumer behavior patterns

IMPROVEMENT GUIDELINES:
- Make campaign titles more catchy and memorable
- Ensure promotional offers are realistic and profitable
- Add specific timing strategies based on weather patterns
- Include psychological triggers (urgency, scarcity, social proof)
- Keep descriptions compelling and benefit-focused (2-3 sentences maximum)
- Ground every insight in the raw data above

OUTPUT FORMAT:
Return the improved campaign recommendations in the same JSON structure, with enhanced content that addresses the above criteria.

CRITICAL: Use the actual data provided above to create specific insights. Do not mention "data needed".

Return only valid JSON without any additional text.
"#,
        current_date = ctx.current_date,
        store_type = store_type,
        zipcode = zipcode,
        metrics = pretty(&report.metrics),
        weather = pretty(&report.weather),
        sentiment = pretty(&report.vector.store_sentiment),
        initial = pretty(initial),
    )
}
