// Prompt templates for every drafting fragment.
// Placeholders: {content} document text, {context} secondary input,
// {example_N} worked examples, {min_words}/{max_words} for the reduction pass.
// Templates must not contain any other braces.

pub const TITLE: &str = "\
Generate a title for the research publication below.

The title should meet the following criteria:
- No colons are allowed in the output.
- Should pique the interest of the reader while still being somewhat descriptive.
- Be understandable to a general audience.
- Should be only one sentence.
- Should have a maximum length of 10 words.

Return only the title text.

PUBLICATION TEXT:
```{content}```";

pub const SUBTITLE: &str = "\
Generate a subtitle for the research publication below that accompanies the given title.

The subtitle should meet the following criteria:
- Be an extension of and related to, but not directly quote, the title.
- Provide information that will make the audience want to find out more about the research.
- Do not use more than 155 characters including spaces.

Return only the subtitle text.

TITLE:
```{context}```

PUBLICATION TEXT:
```{content}```";

pub const SCIENCE: &str = "\
Describe the scientific results of the publication below for a non-expert, non-scientist audience.

The description should meet the following criteria:
- Answer what the big challenge in this field of science is that the research addresses.
- State what the key finding is.
- Explain the science, not the process.
- Be understandable to a high school senior or college freshman.
- Use short sentences and succinct words.
- Avoid technical terms if possible. If technical terms are necessary, define them.
- Provide the necessary context so someone can have a very basic understanding of what was done.
- Use present tense.
- Use a minimum of 75 words and a maximum of 100 words.

PUBLICATION TEXT:
```{content}```";

pub const IMPACT: &str = "\
Describe the impact of the research below to a non-expert, non-scientist audience.

The description should meet the following criteria:
- Answer why the findings presented are important, i.e., what problem the research is trying to solve.
- Answer if the finding is the first of its kind.
- Answer what was innovative or distinct about the research.
- Answer what the research enables other scientists in the field to do next.
- Include other scientific fields potentially impacted.
- Be understandable to a high school senior or college freshman.
- Use short sentences and succinct words.
- Avoid technical terms if possible. If technical terms are necessary, define them.
- Use present tense.
- Speak about the research or researchers in first person.
- Use a minimum of 75 words and a maximum of 100 words.

PUBLICATION TEXT:
```{content}```";

pub const SUMMARY: &str = "\
Generate a general summary of the research publication below.

The summary should meet the following criteria:
- Relay key findings and value.
- Remain accessible to the non-specialist but may be more technical if necessary.
- Do not mention the names of institutions.
- If a United States Department of Energy Office of Science user facility such as NERSC is involved, you may mention the user facility.
- Be 1 or 2 paragraphs detailing the research.
- Use present tense.
- Speak about the research or researchers in first person.
- Use no more than 200 words.

PUBLICATION TEXT:
```{content}```";

pub const CITATION: &str = "\
Generate a citation for the publication below in Chicago style.
Use only information present in the publication text. Return only the citation.

PUBLICATION TEXT:
```{content}```";

pub const FUNDING: &str = "\
Extract the funding statement from the publication below.
Return the statement exactly as written, without commentary. If no funding statement is present, return an empty response.

PUBLICATION TEXT:
```{content}```";

pub const FIGURE_CAPTION: &str = "\
Write a short, general caption for an illustrative image that accompanies a highlight of the research publication below.
The caption should describe the research topic for a general audience in one or two sentences, using between 10 and 30 words.

PUBLICATION TEXT:
```{content}```";

pub const OBJECTIVE: &str = "\
Generate one sentence stating the core purpose of the study described in the publication below.

The sentence should meet the following criteria:
- Start with an active verb.
- Use present tense.
- Do not include methodology such as statistical, technological, or theory based approaches.

EXAMPLE OBJECTIVE 1:
{example_1}

EXAMPLE OBJECTIVE 2:
{example_2}

PUBLICATION TEXT:
```{content}```";

pub const OBJECTIVE_EXAMPLE_ONE: &str = "\
Quantify how projected changes in snowpack alter the timing of water availability for irrigated agriculture across the western United States.";

pub const OBJECTIVE_EXAMPLE_TWO: &str = "\
Determine whether coordinated operation of regional power grids reduces the risk of electricity shortfalls during multi-day heat waves.";

pub const APPROACH: &str = "\
Clearly and concisely state in 2-3 short points how the work below accomplished the stated objective from a methodological perspective.

The points should meet the following criteria:
- Build on the objective statement.
- Only include methodology including but not limited to statistical, technological, and theory based approaches.
- Use a different action verb to start each point than the one that begins the objective statement.
- Start each point with an active verb.
- Use present tense.

EXAMPLE POINTS 1:
{example_1}

EXAMPLE POINTS 2:
{example_2}

OBJECTIVE:
```{context}```

PUBLICATION TEXT:
```{content}```";

pub const APPROACH_EXAMPLE_ONE: &str = "\
- Couples a land surface model with a reservoir operations model at 1/8 degree resolution.
- Evaluates 30 climate scenarios spanning a range of warming levels.";

pub const APPROACH_EXAMPLE_TWO: &str = "\
- Simulates hourly grid operations using a production cost model.
- Compares isolated and coordinated dispatch under historical heat wave conditions.
- Tests sensitivity to transmission capacity expansions.";

pub const IMPACT_POINTS: &str = "\
Clearly and concisely state in 3 points the key results and outcomes from the research below.

The points should meet the following criteria:
- State what the results indicate.
- Include results that may be considered profound or surprising.
- Each point should be 1 concise sentence.
- Use present tense.

PUBLICATION TEXT:
```{content}```";

pub const FIGURE_LIST: &str = "\
List every figure referenced in the publication below, one per line, using exactly this format:
Figure identifier :: one-line description

Use the identifier exactly as it appears in the text, for example Figure 1 or Fig. 2.
Do not list tables. Do not add numbering, bullets, or any other text.

PUBLICATION TEXT:
```{content}```";

pub const SELECTED_FIGURE_CAPTION: &str = "\
Write an editorial caption for the figure identified below from the publication text.
The caption should explain what the figure shows and why it matters to a general audience in at most two sentences.
Return only the caption.

FIGURE IDENTIFIER:
```{context}```

PUBLICATION TEXT:
```{content}```";

pub const REDUCE_WORDCOUNT: &str = "\
Reduce the following text to between {min_words} words and {max_words} words.
Preserve the meaning, tone, and tense of the original. Return only the reduced text.

TEXT:
```{content}```";
