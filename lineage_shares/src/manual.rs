/*!

This is the long-form manual for `lineage_shares` and `lineagedash`.

## Input formats

The following formats are supported:
* `wide_csv` one file per prefecture, one column per lineage
* `long_csv` one row per (prefecture, lineage, week) observation
* `wide_xlsx` the same layout as `wide_csv`, in an Excel (.xlsx) workbook

### `wide_csv`

The layout used by the published lineage tables. The first column is the date
of the week, the second column is the wave, and every other column is a lineage:

| date       | wave | BA.1 | BA.2 | BA.5 |
|------------|------|------|------|------|
| 2022/1     | 6    | 60.1 | 30.2 |      |
| 2022-01-14 | 6    | 41.0 | 52.3 | 0.2  |

Notes:
- the prefecture is not part of the file. It is given by the `prefecture`
  field of the source, or else taken from the file name (`Tokyo.csv`)
- empty cells, `NA` and `NaN` are absent values, not zeros
- a lineage that appears in several columns is summed
- values are percentages or fractions, see `valueScale` below

### `long_csv`

One observation per row, with the header
`prefecture,lineage,week,wave,value`. Several rows for the same prefecture,
lineage and week add up.

### `wide_xlsx`

The `wide_csv` layout, read from the first worksheet or from the worksheet
named in `worksheetName`. Date cells are read as calendar dates.

## Weeks

All the dates are turned into ISO-8601 weeks (weeks start on Monday, and the
first week of the year contains its first Thursday). The following encodings
are understood:
- `2022/1`, `2022/01` or `2022/1週`
- `2022-01-07`, `2022/01/07`, `2022-01-07T00:00:00Z`, `2022-01-07 12:00:00`
- `20220107` (a date without separators)
- a number of milliseconds since 1970-01-01 UTC (at least 10 digits)

A `YYYY/W` label must name a week that exists in the ISO calendar: `2022/53`
is rejected because 2022 only has 52 ISO weeks, while `2020/53` is accepted.

Weeks are always printed as `2022/01`.

A row with a week that cannot be understood stops the processing, unless
`onMalformedWeek` is set to `skip` (or `--skip-malformed` is passed). Skipped
rows are logged as warnings.

## Waves

The selection `6`, `7` or `8` picks a single wave. `6-8` (or `combined`, `all`)
picks the three waves together.

## Configuration

```json
{
  "outputSettings": { "title": "Tokyo, 6th wave", "outputPath": "out.json" },
  "sources": [
    { "provider": "wide_csv", "filePath": "Tokyo.csv", "prefecture": "Tokyo", "valueScale": "percent" }
  ],
  "selection": { "wave": "6", "prefectures": ["Tokyo"] },
  "views": { "topK": 10, "heatmapTopK": 20, "overflowRank": 21, "maxDisplayedRank": 20 },
  "ingestion": { "onMalformedWeek": "abort" }
}
```

Relative file paths are resolved from the directory of the configuration file.

In `views`, a value of 0 turns the option off: `topK: 0` ranks all the lineages,
`heatmapTopK: 0` keeps all of them in the heatmap, `overflowRank: 0` leaves gaps
for the weeks without the lineage and `maxDisplayedRank: 0` draws every rank.

`rankReference` names a historical rank table (`Rank_lineage_Tokyo_6wave.csv`):
the lineages in the first column, one column per week. The run fails if a cell
differs from the computed ranks of the prefecture named in the file name.

`valueScale` is one of:
- `percent` the values are divided by 100
- `fraction` the values are used as is
- `auto` (default) the values of a source are percentages if any of them is above 1

Prefectures may be given in English (`Tokyo`, `Gunma` or `Gumma`) or in Japanese
(`東京都`). `all` or `全国` is the national total.

## Output

A JSON document with, for each selected prefecture:
- `ratio` the share series of every lineage
- `heatmap` the dense lineage x week matrix
- `ranks` the rank of every ranked lineage, week by week, as drawn in the chart
- `dominant` the lineage with the highest share of every week

and a `summary` with the dominant lineages of all the prefectures on the same weeks.

The ranks in the output follow the display settings: with the defaults, ranks
above 20 and weeks without the lineage are drawn at 21.
*/
