/*!

This is the long-form manual for `entrant_selection` and `entrantdraw`.

## Overview

A draw fills a number of places (`--number-spaces`) with respondents of a form.
Some entrants may be pre-approved: they take a place without being drawn. The
other places are drawn uniformly at random among the eligible respondents.
The respondents that were eligible but not drawn are kept in a remainder file,
so that a later draw (`--draw-remaining`) can pick among them only.

A respondent is eligible when:
* every eligibility question was answered with `Yes`
* the respondent is not pre-approved
* the respondent is an active (`Standard`) member of the membership registry

## Membership matching

The roster of the form and the membership registry are filled in
independently, so names and emails rarely agree character for character.
A respondent is a member if any of the following holds:
* the name-key of the respondent equals the name-key of a member. The name-key
  is made of the first and the last words of the full name, lowercased:
  `Jane Q. Doe` becomes `jane doe`.
* the name-key of the respondent equals the name read from the email of a
  member: `jane.doe.21@ucl.ac.uk` reads as `jane doe`. Emails without a dot in
  their local part do not provide a name.
* the emails are the same, ignoring case and surrounding spaces.

## Input formats

### Roster

* `msforms` Results from Microsoft Forms or Google Forms, downloaded in Excel
  (.xlsx) format. The first row contains the questions.
* `csv` Comma Separated Values, with a header row. The remainder file written by
  a previous draw is in this format.

The columns are found by their header: `--email-column`, `--name-column` and
the eligibility questions with `--eligibility-columns` (repeated once per
question). When the questions are the last columns of the form, it is simpler
to pass `--first-eligibility-column` with the position (`5`) or the letter
(`E`) of the first of them.

### Membership registry

A CSV file with the columns `Membership type`, `Email` and `Full name`.

## Configuration

All the options can be stored in a JSON file passed with `--config`. Relative
paths in the file are relative to the location of the file. The options passed
on the command line take precedence.

```json
{
  "outputSettings": { "outputDirectory": "draws" },
  "rosterSource": {
    "provider": "msforms",
    "filePath": "responses.xlsx",
    "emailColumn": "UCL Email Address",
    "nameColumn": "Full Name (on your UCL Student Card)",
    "firstEligibilityColumnIndex": "E"
  },
  "membershipSource": { "filePath": "membership.csv" },
  "rules": { "numberOfSpaces": 20, "preApproved": ["Alice Smith"], "randomSeed": "2022" }
}
```

## Reproducible draws

Passing `--seed` makes the draw deterministic: the same inputs and the same
seed give the same selection. Combined with `--out` (JSON summary) and
`--reference`, a published draw can be checked by anyone holding the inputs.

*/
