/*!

This is the long-form manual for `constituency_map` and `acmap`.

## Input files

### Results

One row per candidate, as an Excel workbook (`xlsx`) or a comma-separated
file (`csv`). The first row is the header. Columns are found by name:

| Column           | Required | Content                                  |
|------------------|----------|------------------------------------------|
| `AC ID`          | yes      | constituency id, a non-negative integer  |
| `TOTAL`          | yes      | valid votes of the candidate             |
| `AC NAME`        |          | constituency name                        |
| `STATE/UT NAME`  |          | state name                               |
| `STATE CODE`     |          | state code                               |
| `AC NO.`         |          | constituency number inside the state     |
| `CANDIDATE NAME` |          |                                          |
| `PARTY`          |          |                                          |
| `AGE`            |          |                                          |
| `GENDER`         |          | `MALE`, `FEMALE`, ...                    |
| `CATEGORY`       |          | `SC`, `ST`, `GEN`                        |
| `POSTAL`         |          | postal votes of the candidate            |
| `TOTAL ELECTORS` |          | registered electors of the constituency  |
| `YEAR`           |          |                                          |
| `BYELECTION`     |          | `0/1`, `TRUE/FALSE` or `YES/NO`          |
| `WIKIPEDIA LINK` |          |                                          |

The constituency-level columns (names, electors, year, ...) are read from
the first row of each constituency.

Blank rows are skipped. A required cell that cannot be read stops the
program before anything is written. Optional cells that cannot be read are
treated as missing.

### Boundaries

A GeoJSON `FeatureCollection`. Every feature carries the constituency id
(property `ac_id` by default) and the state name (property `st_name` by
default) in its properties. Polygons, multi-polygons and geometry
collections are supported.

### Palette

A JSON object from party name to color. A color is either a CSS string
(`"#ff9933"`) or a list of four numbers between 0 and 1 (red, green,
blue, alpha).

## Output files

All the files are written in the output directory. Nothing is written if
one of the inputs cannot be read.

### `map_data.json`

The boundaries, with the properties of every feature overlaid by the
results of its constituency:

- `ac_id`, `ac_name`, `st_name`, `ac_no`
- `winner_name`, `winner_party`, `winner_age`, `winner_gender`, `winner_category`
- `runnerup_party` (`N/A` if there was a single candidate)
- `margin`: votes of the winner minus votes of the runner-up
- `turnout`: percentage of the electors, `null` if the elector count is missing
- `total_votes`, `total_electors`, `total_postal`
- `party_vote_shares`: party -> percentage of the valid votes
- `top_candidates`: the first 5 candidates with `name`, `party`, `votes`,
  `share` and `lost_deposit` (less than one sixth of the valid votes)
- `is_bye_election`, `year`, `wiki_link`

Features without results are left untouched.

### `search_index.json`

A list of `{"label": "<constituency> (<state>)", "id": <ac_id>, "st_code": <code>}`
sorted by id.

### `state_bounds.json`

An object from state name to `[[min lat, min lon], [max lat, max lon]]`.

## Queries

Filters are written as URL query strings. The keys are `age`, `gender`,
`category`, `margin`, `turnout` and `party`; each value is a
comma-separated list of tokens:

- `age`: `21-35`, `36-45`, `46-55`, `56-65`, `65+`
- `margin` (percent of the valid votes): `<2`, `2-5`, `5-10`, `10-20`, `>20`
- `turnout` (percent): `<60`, `60-70`, `70-75`, `75-80`, `80-85`, `>85`
- `gender`: `MALE`, `FEMALE`
- `category`: `SC`, `ST`, `GEN`
- `party`: any party name

For example `gender=FEMALE&margin=%3C2,2-5` selects the constituencies won
by a woman with a margin of at most 5%. A `gender` or `category` token
outside these lists selects nothing. A constituency with a missing value
never passes a constraint on that dimension.

The display modes are `WINNER`, `RUNNER_UP`, `VOTE_SHARE` (requires a
party), `MARGIN`, `TURNOUT`, `DEMOGRAPHICS_GENDER`,
`DEMOGRAPHICS_CATEGORY` and `DEMOGRAPHICS_AGE`.

Missing values are colored as follows:

- turnout and margin: as 0%, the lowest band
- winner age or winner gender: the neutral grey `#808080`, not the
  youngest band nor the color of women
- winner category: as General
- a boundary without election data: the neutral grey, in every mode

Any gender other than `MALE` gets the color of women.

*/
