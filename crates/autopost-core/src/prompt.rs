use crate::schedule::friday_variant;
use crate::theme::{CtaStyle, FridayVariant, Theme, ThemeKey};
use chrono::{DateTime, Datelike, TimeZone};
use std::fmt::Write as _;

/// Used in the weekly-plan CTA when no storefront URL is configured.
pub const STOREFRONT_PLACEHOLDER: &str = "[STAN STORE LINK]";

const VOICE_PREAMBLE: &str = r##"You are writing as PottyMouthPanda.

VOICE RULES:
- Profanity is normal and on-brand (fuck, shit, ass allowed).
- Do NOT swear every sentence.
- Conversational, honest, slightly unhinged, and funny when it fits.
- No corporate tone. No therapy-speak. No inspirational poster bullshit.
- No alcohol/wine references.
- Never mention being an AI or model.

STYLE RULES:
- Short paragraphs, skimmable, readable.
- Use H2 headers where useful.
- Avoid repeating the same framework phrases post-to-post."##;

const OUTPUT_CONTRACT: &str = r##"OUTPUT FORMAT (STRICT):
Return a single JSON object and nothing else: no prose before or after it, no code fences.
The object must have exactly these keys and no others:
- "title": string
- "excerpt": string, at most 160 characters
- "html": string, the full post body as HTML"##;

const MOM_CHAOS_BODY: &str = r##"REQUIREMENTS:
- Center on ONE specific, relatable parenting moment/story (real-life chaos, mental load, burnout, schedules, kids).
- NO recipes.
- NO meal plan.
- Include ONE practical tip, trick, or mindset shift at the end.

STRUCTURE:
1) Hook + story (real, specific)
2) Why it hit so hard / what made it chaotic
3) The "here's what actually helped" tip
4) Gentle close (no hard sell)

CTA:
- Optional
- One sentence max
- Soft mention only, like: "This is why I simplify meals so hard."

LENGTH:
700–1000 words"##;

const WTFS_BODY: &str = r##"REQUIREMENTS:
- Feature ONE new family- and budget-friendly recipe.
- Weeknight realistic.
- Include FULL ingredients and step-by-step instructions.
- Include optional swaps for picky eaters and budget constraints.

HARD RULES:
- NO weekly plan.
- NO long storytelling.
- NO "framework" post.

STRUCTURE:
1) Hook + why this recipe exists
2) Ingredients
3) Instructions
4) Swaps/shortcuts
5) Why it works + quick close

CTA:
- Soft (one sentence) and optional:
  "This is the kind of recipe I build my weekly plans around."

LENGTH:
600–900 words"##;

const FRIDAY_TYPE_RULES: &str = r##"TYPE RULES:
A = Low-Effort Dinner Wins
- Frozen food, snack plates, breakfast for dinner, shortcuts that count.
- Normalize "bare minimum" as smart.

B = Parenting Permission Slips
- Dismantle guilt. Validate tired parents.
- No fixing. Just permission and relief.

C = Hot Takes (safe)
- Call out harmful expectations or narratives.
- Focus on systems/culture, not attacking individuals.
- Grounded, not mean.

STRUCTURE:
1) Strong opening opinion
2) Normalize the shortcut/belief
3) Reframe guilt/expectations
4) Calm, relieving close

CTA:
- Optional
- Never salesy

LENGTH:
700–1000 words"##;

const SUNDAY_BODY: &str = r##"PURPOSE:
- Weekly meal plan OVERVIEW only.
- Do NOT include full recipes.
- Do NOT teach a framework.
- Keep it skimmable and confident.

REQUIRED CONTENT:
- 3 breakfast options
- 2–3 lunch options
- 1–2 rotating snack options
- 6 dinners

STRUCTURE:
1) Short relief-focused opening
2) Breakfast list
3) Lunch list
4) Snack list
5) Dinner list
6) 3–5 bullet "why this plan works"
7) Direct CTA"##;

/// Assemble the instruction for the generative API.
///
/// Pure: identical inputs always yield the identical string.
pub fn build_prompt<Z: TimeZone>(
    theme: &Theme,
    publish_at: &DateTime<Z>,
    storefront_url: Option<&str>,
) -> String {
    let publish_date = publish_at.date_naive();
    let weekday = publish_date.weekday().num_days_from_monday();
    let cta = CtaStyle::for_weekday(weekday);

    let mut prompt = String::with_capacity(4096);
    prompt.push_str(VOICE_PREAMBLE);
    prompt.push_str("\n\n");

    let _ = writeln!(prompt, "Write a {} blog post.", theme.label);
    let _ = writeln!(prompt, "CATEGORY: {}", theme.category);
    if let Some(angle) = theme.angle.as_deref() {
        let _ = writeln!(prompt, "ANGLE: {angle}");
    }
    prompt.push('\n');

    match theme.key {
        ThemeKey::MomChaosMonday => prompt.push_str(MOM_CHAOS_BODY),
        ThemeKey::WtfsWednesday => prompt.push_str(WTFS_BODY),
        ThemeKey::FuckItFriday => {
            let variant = friday_variant(publish_date);
            push_friday_type(&mut prompt, variant);
            prompt.push_str(FRIDAY_TYPE_RULES);
        }
        ThemeKey::FeedTheChaosSunday => {
            prompt.push_str(SUNDAY_BODY);
            let link = storefront_url
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .unwrap_or(STOREFRONT_PLACEHOLDER);
            let _ = write!(
                prompt,
                "\n\nCTA (DIRECT):\n\"This is the overview. The full plan lives inside Feed the Chaos.\"\nInclude the link: {link}\n\nLENGTH:\n600–800 words"
            );
        }
    }

    let _ = write!(prompt, "\n\nCTA STYLE: {}\n\n", cta.as_str());
    prompt.push_str(OUTPUT_CONTRACT);
    prompt.push('\n');
    prompt
}

fn push_friday_type(prompt: &mut String, variant: FridayVariant) {
    let _ = write!(
        prompt,
        "THIS WEEK'S TYPE: {} ({})\n\n",
        variant.letter(),
        variant.title()
    );
}
