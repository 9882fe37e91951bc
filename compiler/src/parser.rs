use crate::element::*;
use crate::error::ThriftError;
use crate::location::Location;
use crate::tokenizer::{tokenize, Comment, Token, TokenKind};
use crate::utils::{error, quote};

/// Parses the text of one `.thrift` file. `location` names the file and is
/// copied onto every element; the parser never touches the filesystem.
///
/// Example usage:
///
/// ```
/// use brine_thrift_compiler::{parse_thrift_file, Location};
///
/// let file = parse_thrift_file(
///     &Location::new("point.thrift", 0, 0),
///     "struct Point { 1: i32 x; 2: i32 y }",
/// ).unwrap();
/// assert_eq!(file.structs[0].name, "Point");
/// assert_eq!(file.structs[0].fields[1].field_id, 2);
/// ```
///
pub fn parse_thrift_file(location: &Location, text: &str) -> Result<ThriftFileElement, ThriftError> {
    let stream = tokenize(text, location)?;
    let mut parser = Parser {
        location,
        tokens:       stream.tokens,
        comments:     stream.comments,
        index:        0,
        next_comment: 0,
        last_line:    0,
    };
    parser.parse_file()
}

/// The parse-in-progress over one file's token stream.
struct Parser<'a> {
    location:     &'a Location,
    tokens:       Vec<Token>,
    comments:     Vec<Comment>,
    index:        usize,
    next_comment: usize,
    /// Line of the most recently consumed token, for trailing comments.
    last_line:    usize,
}

/// Integer literal: decimal or `0x` hex, with an optional sign.
pub fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i128>().ok()?,
    };
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.index].clone();
        if token.kind != TokenKind::Eof {
            self.index += 1;
            self.last_line = token.line;
        }
        token
    }

    fn loc(&self, token: &Token) -> Location {
        self.location.at(token.line, token.column)
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.peek().is_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expected(&self, expected: &str) -> ThriftError {
        let token = self.peek();
        let found = if token.kind == TokenKind::Eof {
            "end of file".to_owned()
        } else {
            quote(&token.text)
        };
        error(&format!("Expected {} but found {}", expected, found), &self.loc(token))
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<Token, ThriftError> {
        if self.peek().is_symbol(symbol) {
            Ok(self.advance())
        } else {
            Err(self.expected(&quote(symbol)))
        }
    }

    fn expect_identifier(&mut self) -> Result<Token, ThriftError> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.advance())
        } else {
            Err(self.expected("identifier"))
        }
    }

    fn expect_literal(&mut self) -> Result<String, ThriftError> {
        if self.peek().kind == TokenKind::Literal {
            let token = self.advance();
            self.unescape(&token)
        } else {
            Err(self.expected("string literal"))
        }
    }

    /// Optional `,` or `;` after a list item or definition.
    fn eat_separator(&mut self) {
        if !self.eat_symbol(",") {
            self.eat_symbol(";");
        }
    }

    // documentation

    fn comment_precedes_current(&self, comment: &Comment) -> bool {
        let token = self.peek();
        (comment.line, comment.column) < (token.line, token.column)
    }

    /// Every unclaimed comment before the current token.
    fn leading_doc(&mut self) -> String {
        let mut parts = Vec::new();
        while let Some(comment) = self.comments.get(self.next_comment) {
            if !self.comment_precedes_current(comment) {
                break;
            }
            let doc = comment.doc();
            if !doc.is_empty() {
                parts.push(doc);
            }
            self.next_comment += 1;
        }
        parts.join("\n")
    }

    /// A comment that starts on the line where the previous element ended.
    fn trailing_doc(&mut self) -> String {
        match self.comments.get(self.next_comment) {
            Some(comment)
                if comment.line == self.last_line && self.comment_precedes_current(comment) =>
            {
                let doc = comment.doc();
                self.next_comment += 1;
                doc
            }
            _ => String::new(),
        }
    }

    /// Drops comments that nothing follows inside a block, so they don't leak
    /// onto the next definition.
    fn discard_comments(&mut self) {
        while let Some(comment) = self.comments.get(self.next_comment) {
            if !self.comment_precedes_current(comment) {
                break;
            }
            self.next_comment += 1;
        }
    }

    fn join_doc(leading: String, trailing: String) -> String {
        match (leading.is_empty(), trailing.is_empty()) {
            (_, true) => leading,
            (true, false) => trailing,
            (false, false) => format!("{}\n{}", leading, trailing),
        }
    }

    // literals

    fn unescape(&self, token: &Token) -> Result<String, ThriftError> {
        let raw = &token.text[1..token.text.len() - 1];
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars().enumerate();

        while let Some((offset, ch)) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            // +1 for the opening quote.
            let location = self.location.at(token.line, token.column + offset + 1);
            let escaped = match chars.next() {
                Some((_, escaped)) => escaped,
                None => return Err(error("Unterminated escape sequence", &location)),
            };
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'a' => out.push('\u{07}'),
                'b' => out.push('\u{08}'),
                'f' => out.push('\u{0c}'),
                'v' => out.push('\u{0b}'),
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                '\'' => out.push('\''),
                'u' => {
                    return Err(ThriftError::UnsupportedEscape {
                        escape: "\\u".to_owned(),
                        location,
                    })
                }
                other => {
                    return Err(error(
                        &format!("Invalid escape sequence \\{}", other),
                        &location,
                    ))
                }
            }
        }
        Ok(out)
    }

    // top level

    fn parse_file(&mut self) -> Result<ThriftFileElement, ThriftError> {
        let mut file = ThriftFileElement::new(self.location.clone());

        loop {
            let doc = self.leading_doc();
            let token = self.peek().clone();
            let location = self.loc(&token);

            if token.kind == TokenKind::Eof {
                break;
            }
            if token.kind != TokenKind::Identifier {
                return Err(error(&format!("Unexpected token {}", quote(&token.text)), &location));
            }

            match token.text.as_str() {
                "include" => {
                    self.advance();
                    let path = self.expect_literal()?;
                    file.includes.push(IncludeElement { location, path });
                    self.eat_separator();
                }
                "cpp_include" => {
                    self.advance();
                    let path = self.expect_literal()?;
                    file.cpp_includes.push(IncludeElement { location, path });
                    self.eat_separator();
                }
                "namespace" => {
                    self.advance();
                    file.namespaces.push(self.parse_namespace(location)?);
                }
                "php_namespace" | "xsd_namespace" | "cpp_namespace" | "java_package"
                | "py_module" | "perl_package" | "ruby_namespace" | "csharp_namespace"
                | "cocoa_prefix" | "smalltalk_category" | "smalltalk_prefix" => {
                    self.advance();
                    file.namespaces.push(self.parse_legacy_namespace(&token.text, location)?);
                }
                "typedef" => {
                    self.advance();
                    let typedef = self.parse_typedef(location, doc)?;
                    file.typedefs.push(typedef);
                }
                "const" => {
                    self.advance();
                    let constant = self.parse_const(location, doc)?;
                    file.constants.push(constant);
                }
                "enum" => {
                    self.advance();
                    let enum_element = self.parse_enum(location, doc)?;
                    file.enums.push(enum_element);
                }
                "struct" | "union" | "exception" => {
                    self.advance();
                    let kind = match token.text.as_str() {
                        "union" => StructKind::Union,
                        "exception" => StructKind::Exception,
                        _ => StructKind::Struct,
                    };
                    let struct_element = self.parse_struct(kind, location, doc)?;
                    file.structs.push(struct_element);
                }
                "service" => {
                    self.advance();
                    let service = self.parse_service(location, doc)?;
                    file.services.push(service);
                }
                _ => {
                    return Err(error(
                        &format!("Unexpected token {}", quote(&token.text)),
                        &location,
                    ))
                }
            }
        }

        Ok(file)
    }

    fn parse_namespace(&mut self, location: Location) -> Result<NamespaceElement, ThriftError> {
        let scope_token = if self.peek().is_symbol("*") {
            self.advance()
        } else {
            self.expect_identifier()?
        };
        if scope_token.text == "xsd" {
            return Err(error(
                "'namespace xsd' is not supported. Use 'xsd_namespace' instead",
                &self.loc(&scope_token),
            ));
        }

        let namespace = self.parse_namespace_name()?;
        let annotations = self.parse_optional_annotations()?;
        self.eat_separator();

        Ok(NamespaceElement {
            location,
            scope: NamespaceScope::from_name(&scope_token.text),
            namespace,
            annotations,
        })
    }

    fn parse_legacy_namespace(
        &mut self,
        keyword: &str,
        location: Location,
    ) -> Result<NamespaceElement, ThriftError> {
        let scope = match keyword {
            "php_namespace" => NamespaceScope::Php,
            "xsd_namespace" => NamespaceScope::Xsd,
            "cpp_namespace" => NamespaceScope::Cpp,
            "java_package" => NamespaceScope::Java,
            "py_module" => NamespaceScope::Py,
            "perl_package" => NamespaceScope::Perl,
            "ruby_namespace" => NamespaceScope::Rb,
            "csharp_namespace" => NamespaceScope::Csharp,
            "cocoa_prefix" => NamespaceScope::Cocoa,
            _ => NamespaceScope::Smalltalk,
        };
        let namespace = self.parse_namespace_name()?;
        self.eat_separator();

        Ok(NamespaceElement {
            location,
            scope,
            namespace,
            annotations: Annotations::new(),
        })
    }

    fn parse_namespace_name(&mut self) -> Result<String, ThriftError> {
        match self.peek().kind {
            TokenKind::Identifier => Ok(self.advance().text),
            TokenKind::Literal => self.expect_literal(),
            _ => Err(self.expected("namespace name")),
        }
    }

    // types

    fn parse_type(&mut self) -> Result<TypeElement, ThriftError> {
        let token = self.expect_identifier()?;
        let location = self.loc(&token);

        let kind = match token.text.as_str() {
            "list" | "set" => {
                self.skip_cpp_type()?;
                self.expect_symbol("<")?;
                let element = Box::new(self.parse_type()?);
                self.expect_symbol(">")?;
                if token.text == "list" {
                    TypeElementKind::List(element)
                } else {
                    TypeElementKind::Set(element)
                }
            }
            "map" => {
                self.skip_cpp_type()?;
                self.expect_symbol("<")?;
                let key = Box::new(self.parse_type()?);
                self.expect_symbol(",")?;
                let value = Box::new(self.parse_type()?);
                self.expect_symbol(">")?;
                TypeElementKind::Map(key, value)
            }
            "slist" => TypeElementKind::Named("string".to_owned()),
            name => TypeElementKind::Named(name.to_owned()),
        };

        let annotations = self.parse_optional_annotations()?;
        Ok(TypeElement {
            location,
            kind,
            annotations,
        })
    }

    /// `list cpp_type "std::deque" <i32>`: the C++ hint is accepted and dropped.
    fn skip_cpp_type(&mut self) -> Result<(), ThriftError> {
        if self.eat_keyword("cpp_type") {
            self.expect_literal()?;
        }
        Ok(())
    }

    fn parse_optional_annotations(&mut self) -> Result<Annotations, ThriftError> {
        let mut annotations = Annotations::new();
        if !self.eat_symbol("(") {
            return Ok(annotations);
        }

        while !self.eat_symbol(")") {
            let key = self.expect_identifier()?.text;
            let value = if self.eat_symbol("=") {
                self.expect_literal()?
            } else {
                String::new()
            };
            annotations.insert(key, value);
            self.eat_separator();
        }
        Ok(annotations)
    }

    // constants

    fn parse_const_value(&mut self) -> Result<ConstValueElement, ThriftError> {
        let token = self.peek().clone();
        let location = self.loc(&token);

        let kind = match token.kind {
            TokenKind::Integer => {
                self.advance();
                let value = parse_integer(&token.text).ok_or_else(|| {
                    error(
                        &format!("Integer literal {} is out of range", quote(&token.text)),
                        &location,
                    )
                })?;
                ConstValueKind::Integer(value)
            }
            TokenKind::Double => {
                self.advance();
                let value = token.text.parse::<f64>().map_err(|_| {
                    error(&format!("Invalid number {}", quote(&token.text)), &location)
                })?;
                ConstValueKind::Double(value)
            }
            TokenKind::Literal => ConstValueKind::Literal(self.expect_literal()?),
            TokenKind::Identifier => ConstValueKind::Identifier(self.advance().text),
            TokenKind::Symbol if token.text == "[" => {
                self.advance();
                let mut values = Vec::new();
                while !self.eat_symbol("]") {
                    values.push(self.parse_const_value()?);
                    self.eat_separator();
                }
                ConstValueKind::List(values)
            }
            TokenKind::Symbol if token.text == "{" => {
                self.advance();
                let mut entries = Vec::new();
                while !self.eat_symbol("}") {
                    let key = self.parse_const_value()?;
                    self.expect_symbol(":")?;
                    let value = self.parse_const_value()?;
                    entries.push((key, value));
                    self.eat_separator();
                }
                ConstValueKind::Map(entries)
            }
            _ => return Err(self.expected("constant value")),
        };

        Ok(ConstValueElement { location, kind })
    }

    fn parse_const(&mut self, location: Location, doc: String) -> Result<ConstElement, ThriftError> {
        let const_type = self.parse_type()?;
        let name = self.expect_identifier()?.text;
        self.expect_symbol("=")?;
        let value = self.parse_const_value()?;
        self.eat_separator();
        let trailing = self.trailing_doc();

        Ok(ConstElement {
            location,
            documentation: Self::join_doc(doc, trailing),
            const_type,
            name,
            value,
        })
    }

    // definitions

    fn parse_typedef(&mut self, location: Location, doc: String) -> Result<TypedefElement, ThriftError> {
        let old_type = self.parse_type()?;
        let new_name = self.expect_identifier()?.text;
        let annotations = self.parse_optional_annotations()?;
        self.eat_separator();
        let trailing = self.trailing_doc();

        Ok(TypedefElement {
            location,
            documentation: Self::join_doc(doc, trailing),
            old_type,
            new_name,
            annotations,
        })
    }

    fn parse_enum(&mut self, location: Location, doc: String) -> Result<EnumElement, ThriftError> {
        let name = self.expect_identifier()?.text;
        self.expect_symbol("{")?;

        let mut members = Vec::new();
        let mut next_value: i64 = 0;
        loop {
            let member_doc = self.leading_doc();
            if self.eat_symbol("}") {
                break;
            }

            let name_token = self.expect_identifier()?;
            let value = if self.eat_symbol("=") {
                let token = self.peek().clone();
                if token.kind != TokenKind::Integer {
                    return Err(self.expected("integer"));
                }
                self.advance();
                parse_integer(&token.text).ok_or_else(|| {
                    error(
                        &format!("Integer literal {} is out of range", quote(&token.text)),
                        &self.loc(&token),
                    )
                })?
            } else {
                next_value
            };
            next_value = value.saturating_add(1);

            let annotations = self.parse_optional_annotations()?;
            self.eat_separator();
            let trailing = self.trailing_doc();

            members.push(EnumMemberElement {
                location: self.loc(&name_token),
                documentation: Self::join_doc(member_doc, trailing),
                name: name_token.text,
                value,
                annotations,
            });
        }

        let annotations = self.parse_optional_annotations()?;
        self.eat_separator();
        let trailing = self.trailing_doc();

        Ok(EnumElement {
            location,
            documentation: Self::join_doc(doc, trailing),
            name,
            members,
            annotations,
        })
    }

    fn parse_struct(
        &mut self,
        kind: StructKind,
        location: Location,
        doc: String,
    ) -> Result<StructElement, ThriftError> {
        let name = self.expect_identifier()?.text;
        self.eat_keyword("xsd_all");
        self.expect_symbol("{")?;
        let fields = self.parse_fields("}")?;
        let annotations = self.parse_optional_annotations()?;
        self.eat_separator();
        let trailing = self.trailing_doc();

        Ok(StructElement {
            location,
            documentation: Self::join_doc(doc, trailing),
            kind,
            name,
            fields,
            annotations,
        })
    }

    /// Fields up to and including `close`. Fields without an id get one more
    /// than the largest id seen so far in the list.
    fn parse_fields(&mut self, close: &str) -> Result<Vec<FieldElement>, ThriftError> {
        let mut fields = Vec::new();
        let mut max_id: i64 = 0;

        loop {
            let doc = self.leading_doc();
            if self.eat_symbol(close) {
                break;
            }
            let start = self.peek().clone();
            let location = self.loc(&start);

            let explicit_id = if start.kind == TokenKind::Integer
                && self.peek_at(1).map_or(false, |t| t.is_symbol(":"))
            {
                self.advance();
                self.advance();
                Some(parse_integer(&start.text).ok_or_else(|| {
                    error(&format!("Field id {} is out of range", quote(&start.text)), &location)
                })?)
            } else {
                None
            };
            let field_id = explicit_id.unwrap_or(max_id + 1);
            max_id = max_id.max(field_id);

            let requiredness = if self.eat_keyword("required") {
                Requiredness::Required
            } else if self.eat_keyword("optional") {
                Requiredness::Optional
            } else {
                Requiredness::Default
            };

            let field_type = self.parse_type()?;
            let name = self.expect_identifier()?.text;
            let const_value = if self.eat_symbol("=") {
                Some(self.parse_const_value()?)
            } else {
                None
            };
            let annotations = self.parse_optional_annotations()?;
            self.eat_keyword("xsd_optional");
            self.eat_keyword("xsd_nillable");
            self.eat_separator();
            let trailing = self.trailing_doc();

            fields.push(FieldElement {
                location,
                documentation: Self::join_doc(doc, trailing),
                field_id,
                implicit_id: explicit_id.is_none(),
                requiredness,
                field_type,
                name,
                const_value,
                annotations,
            });
        }

        Ok(fields)
    }

    fn parse_service(&mut self, location: Location, doc: String) -> Result<ServiceElement, ThriftError> {
        let name = self.expect_identifier()?.text;
        let extends = if self.eat_keyword("extends") {
            let token = self.expect_identifier()?;
            Some(TypeElement {
                location:    self.loc(&token),
                kind:        TypeElementKind::Named(token.text),
                annotations: Annotations::new(),
            })
        } else {
            None
        };
        self.expect_symbol("{")?;

        let mut functions = Vec::new();
        loop {
            let function_doc = self.leading_doc();
            if self.eat_symbol("}") {
                break;
            }
            functions.push(self.parse_function(function_doc)?);
        }
        self.discard_comments();

        let annotations = self.parse_optional_annotations()?;
        self.eat_separator();
        let trailing = self.trailing_doc();

        Ok(ServiceElement {
            location,
            documentation: Self::join_doc(doc, trailing),
            name,
            extends,
            functions,
            annotations,
        })
    }

    fn parse_function(&mut self, doc: String) -> Result<FunctionElement, ThriftError> {
        let start = self.peek().clone();
        let location = self.loc(&start);
        let one_way = self.eat_keyword("oneway");

        let return_type = if self.peek().is_keyword("void") {
            let token = self.advance();
            TypeElement {
                location:    self.loc(&token),
                kind:        TypeElementKind::Named("void".to_owned()),
                annotations: Annotations::new(),
            }
        } else {
            self.parse_type()?
        };

        let name = self.expect_identifier()?.text;
        self.expect_symbol("(")?;
        let params = self.parse_fields(")")?;
        let exceptions = if self.eat_keyword("throws") {
            self.expect_symbol("(")?;
            self.parse_fields(")")?
        } else {
            Vec::new()
        };
        let annotations = self.parse_optional_annotations()?;
        self.eat_separator();
        let trailing = self.trailing_doc();

        Ok(FunctionElement {
            location,
            documentation: Self::join_doc(doc, trailing),
            name,
            one_way,
            return_type,
            params,
            exceptions,
            annotations,
        })
    }
}
