//! Document preamble: packages, colours and `listings` defaults.
//!
//! Appended to the `header-includes` metadata so the typesetting template
//! places it before `\begin{document}`.

use mdpdf_config::{Rgb, StyleConfig};

const PACKAGES: &str = r"\usepackage{graphicx}
\usepackage{float}
\usepackage{caption}
\usepackage{listings}
\usepackage{xcolor}";

/// Language definitions missing from stock `listings`.
const LANGUAGES: &str = r#"\lstdefinelanguage{JavaScript}{
  morekeywords={async,await,break,case,catch,class,const,continue,default,delete,do,else,export,extends,finally,for,function,if,import,in,instanceof,let,new,return,super,switch,this,throw,try,typeof,var,void,while,yield,true,false,null,undefined},
  sensitive=true,
  morecomment=[l]{//},
  morecomment=[s]{/*}{*/},
  morestring=[b]',
  morestring=[b]",
  morestring=[b]`
}
\lstdefinelanguage{JSON}{
  morekeywords={true,false,null},
  sensitive=true,
  morestring=[b]"
}
\lstdefinelanguage{YAML}{
  morekeywords={true,false,null,yes,no},
  sensitive=false,
  morecomment=[l]{\#},
  morestring=[b]',
  morestring=[b]"
}
\lstdefinelanguage{Go}{
  morekeywords={break,case,chan,const,continue,default,defer,else,fallthrough,for,func,go,goto,if,import,interface,map,package,range,return,select,struct,switch,type,var,nil,true,false},
  sensitive=true,
  morecomment=[l]{//},
  morecomment=[s]{/*}{*/},
  morestring=[b]",
  morestring=[b]`
}
\lstdefinelanguage{Rust}{
  morekeywords={as,async,await,break,const,continue,crate,dyn,else,enum,extern,false,fn,for,if,impl,in,let,loop,match,mod,move,mut,pub,ref,return,self,Self,static,struct,super,trait,true,type,unsafe,use,where,while},
  sensitive=true,
  morecomment=[l]{//},
  morecomment=[s]{/*}{*/},
  morestring=[b]"
}"#;

/// Accented characters `listings` cannot take as UTF-8 input.
const LITERATE: &str = r#"literate={á}{{\'a}}1 {é}{{\'e}}1 {í}{{\'i}}1 {ó}{{\'o}}1 {ú}{{\'u}}1
           {Á}{{\'A}}1 {É}{{\'E}}1 {Í}{{\'I}}1 {Ó}{{\'O}}1 {Ú}{{\'U}}1
           {ñ}{{\~n}}1 {Ñ}{{\~N}}1 {ü}{{\"u}}1 {Ü}{{\"U}}1"#;

/// Name of a preamble colour.
#[must_use]
pub fn color(name: &str) -> String {
    format!("mdpdf{name}")
}

fn define_color(name: &str, rgb: Rgb) -> String {
    format!("\\definecolor{{{}}}{{RGB}}{{{}}}", color(name), rgb.latex())
}

/// Preamble for a style.
#[must_use]
pub fn preamble(style: &StyleConfig) -> String {
    let colors = [
        ("background", style.background),
        ("border", style.border),
        ("keyword", style.keyword),
        ("comment", style.comment),
        ("string", style.string),
        ("identifier", style.identifier),
        ("error", style.error),
    ]
    .into_iter()
    .map(|(name, rgb)| define_color(name, rgb))
    .collect::<Vec<_>>()
    .join("\n");

    let margin = style.frame_margin;
    let lstset = format!(
        r"\lstset{{
  basicstyle=\ttfamily\small\color{{{identifier}}},
  keywordstyle=\color{{{keyword}}},
  commentstyle=\itshape\color{{{comment}}},
  stringstyle=\color{{{string}}},
  showstringspaces=false,
  breaklines=true,
  frame=single,
  framerule={rule}pt,
  rulecolor=\color{{{border}}},
  backgroundcolor=\color{{{background}}},
  numbers=none,
  tabsize=4,
  aboveskip={above}pt,
  belowskip={below}pt,
  framexleftmargin={margin}pt,
  framexrightmargin={margin}pt,
  framextopmargin={margin}pt,
  framexbottommargin={margin}pt,
  captionpos=t,
  {LITERATE}
}}",
        identifier = color("identifier"),
        keyword = color("keyword"),
        comment = color("comment"),
        string = color("string"),
        border = color("border"),
        background = color("background"),
        rule = style.border_thickness,
        above = style.margin_before,
        below = style.margin_after,
    );

    format!("{PACKAGES}\n{colors}\n{LANGUAGES}\n{lstset}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preamble_colors() {
        let latex = preamble(&StyleConfig::default());

        assert!(latex.starts_with("\\usepackage{graphicx}"));
        assert!(latex.contains("\\definecolor{mdpdfbackground}{RGB}{250, 251, 254}"));
        assert!(latex.contains("\\definecolor{mdpdfcomment}{RGB}{58, 127, 179}"));
        assert!(latex.contains("\\definecolor{mdpdferror}{RGB}{200, 0, 0}"));
    }

    #[test]
    fn test_preamble_defines_extra_languages() {
        let latex = preamble(&StyleConfig::default());

        for language in ["JavaScript", "JSON", "YAML", "Go", "Rust"] {
            assert!(
                latex.contains(&format!("\\lstdefinelanguage{{{language}}}")),
                "missing {language}"
            );
        }
    }

    #[test]
    fn test_lstset_uses_style() {
        let style = StyleConfig {
            border_thickness: 0.5,
            frame_margin: 3.0,
            ..StyleConfig::default()
        };

        let latex = preamble(&style);

        assert!(latex.contains("framerule=0.5pt"));
        assert!(latex.contains("framexleftmargin=3pt"));
        assert!(latex.contains("basicstyle=\\ttfamily\\small\\color{mdpdfidentifier}"));
    }

    #[test]
    fn test_braces_balanced() {
        let latex = preamble(&StyleConfig::default());
        let opens = latex.matches('{').count();
        let closes = latex.matches('}').count();
        assert_eq!(opens, closes);
    }
}
